//! Runs a correction graph over registered datasets.
pub mod orchestrator;
pub mod outputs;

pub use orchestrator::{Workflow, WorkflowReport};
pub use outputs::{NodeFailure, NodeOutput, NodeOutputs};
