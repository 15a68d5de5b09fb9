pub mod summary;

pub use summary::{format_summary, CorrectionSummary, NodeSummary, RunSummary};
