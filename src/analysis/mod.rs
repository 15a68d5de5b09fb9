//! Table preparation and dependency analysis.
pub mod prefilter;
pub mod standardize;
pub mod topology;

pub use prefilter::prepare;
pub use standardize::standardize;
pub use topology::{resolve_order, CorrectionGraph, CorrectionNode, CorrectionSpec};
