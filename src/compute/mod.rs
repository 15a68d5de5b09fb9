//! Particle matching and correction.
pub mod composite;
pub mod engine;
pub mod ledger;
pub mod matcher;
pub mod pool;

pub use composite::{build_synthetic_control, thin_by_phenotype};
pub use engine::{apply_correction, CorrectionEngine, CorrectionOutcome};
pub use ledger::{EliminationLog, EliminationRecord};
pub use matcher::{Match, Matcher};
pub use pool::CandidatePool;
