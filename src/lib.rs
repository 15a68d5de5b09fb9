//! Blank and blind correction of microplastic particle tables.
//!
//! Environmental samples are corrected against procedural controls by
//! removing, for every control particle, the most similar environmental
//! particle. Controls may themselves be corrected first; the order is
//! resolved from a declared correction graph.

pub mod analysis;
pub mod compute;
pub mod config;
pub mod display;
pub mod error;
pub mod store;
pub mod workflow;

pub use analysis::{prepare, resolve_order, standardize, CorrectionSpec};
pub use compute::{apply_correction, build_synthetic_control, CorrectionEngine, EliminationLog, EliminationRecord};
pub use config::{load_plan, ControlMode, CorrectionPlan, ProcessingConfig};
pub use display::{format_summary, RunSummary};
pub use error::{CorrectionError, Result};
pub use store::{MatchingCriteria, Particle, ParticleId, ParticleTable, SizeDimension, TableRole};
pub use workflow::{Workflow, WorkflowReport};
