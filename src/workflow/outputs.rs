//! Write-once storage of per-node correction results.
use crate::compute::CorrectionOutcome;
use crate::config::ControlMode;
use crate::error::{CorrectionError, Result};
use serde::Serialize;
use std::collections::HashMap;

/// Everything produced for one node of the correction graph.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeOutput {
    pub name: String,
    pub controls: Vec<String>,
    /// `None` for nodes without controls, which pass through uncorrected.
    pub mode: Option<ControlMode>,
    pub input_particles: usize,
    pub outcome: CorrectionOutcome,
}

impl NodeOutput {
    pub fn eliminated(&self) -> usize { self.outcome.log.len() }
}

/// A node that could not be produced. Its dependents are skipped as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeFailure {
    pub node: String,
    pub reason: String,
}

/// Node outputs keyed by name. Each slot is written exactly once and read-only
/// afterwards; iteration follows insertion (processing) order.
#[derive(Debug, Clone, Default)]
pub struct NodeOutputs {
    slots: HashMap<String, NodeOutput>,
    order: Vec<String>,
}

impl NodeOutputs {
    pub fn new() -> Self { Self::default() }
    pub fn len(&self) -> usize { self.order.len() }
    pub fn is_empty(&self) -> bool { self.order.is_empty() }

    pub fn get(&self, name: &str) -> Option<&NodeOutput> { self.slots.get(name) }

    pub fn insert(&mut self, output: NodeOutput) -> Result<()> {
        if self.slots.contains_key(&output.name) {
            return Err(CorrectionError::OutputAlreadyWritten(output.name));
        }
        self.order.push(output.name.clone());
        self.slots.insert(output.name.clone(), output);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeOutput> + '_ {
        self.order.iter().filter_map(|name| self.slots.get(name))
    }
}
