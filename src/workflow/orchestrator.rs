//! Drives corrections over a resolved graph.
use super::outputs::{NodeFailure, NodeOutput, NodeOutputs};
use crate::analysis::prefilter::prepare;
use crate::analysis::topology::{CorrectionGraph, CorrectionNode, CorrectionSpec};
use crate::compute::{build_synthetic_control, thin_by_phenotype, CorrectionEngine, CorrectionOutcome, EliminationLog};
use crate::config::{ControlMode, ProcessingConfig};
use crate::error::{CorrectionError, Result};
use crate::store::{MatchingCriteria, ParticleTable};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

/// Everything a run produced, in processing order.
#[derive(Debug, Clone)]
pub struct WorkflowReport {
    pub order: Vec<String>,
    pub outputs: NodeOutputs,
    pub failures: Vec<NodeFailure>,
}

impl WorkflowReport {
    pub fn total_eliminated(&self) -> usize {
        self.outputs.iter().map(NodeOutput::eliminated).sum()
    }

    pub fn corrected(&self, name: &str) -> Option<&ParticleTable> {
        self.outputs.get(name).map(|o| &o.outcome.corrected)
    }
}

/// Prepared datasets plus the configuration they are corrected under.
pub struct Workflow {
    config: ProcessingConfig,
    criteria: MatchingCriteria,
    datasets: Vec<ParticleTable>,
    index: HashMap<String, usize>,
}

impl Workflow {
    /// Validates the configuration up front; an unsupported size dimension
    /// fails here, before any table is touched.
    pub fn new(config: ProcessingConfig) -> Result<Self> {
        let criteria = config.matching_criteria()?;
        config.size_filter_dimension()?;
        Ok(Self { config, criteria, datasets: Vec::new(), index: HashMap::new() })
    }

    pub fn config(&self) -> &ProcessingConfig { &self.config }
    pub fn criteria(&self) -> &MatchingCriteria { &self.criteria }

    /// Registers a dataset under its table name after running the pre-filter
    /// pipeline on it. The raw table is not kept.
    pub fn add_dataset(&mut self, table: &ParticleTable) -> Result<()> {
        if self.index.contains_key(table.name()) {
            return Err(CorrectionError::DuplicateDataset(table.name().to_string()));
        }
        let prepared = prepare(table, &self.config)?;
        self.index.insert(prepared.name().to_string(), self.datasets.len());
        self.datasets.push(prepared);
        Ok(())
    }

    pub fn dataset(&self, name: &str) -> Option<&ParticleTable> {
        self.index.get(name).map(|&i| &self.datasets[i])
    }

    /// The declared corrections plus a control-free node for every registered
    /// dataset the declaration does not mention as a target.
    pub fn full_spec(&self, spec: &CorrectionSpec) -> CorrectionSpec {
        let mut full = spec.clone();
        for table in &self.datasets {
            if !spec.contains(table.name()) {
                full.push(CorrectionNode::new(table.name(), Vec::<String>::new()));
            }
        }
        full
    }

    /// Runs every node of the graph.
    pub fn run(&self, spec: &CorrectionSpec) -> Result<WorkflowReport> {
        let graph = CorrectionGraph::build(&self.full_spec(spec))?;
        let order = graph.resolve()?;
        self.execute(&graph, order)
    }

    /// Runs only `targets` and the nodes they depend on.
    pub fn run_targets(&self, spec: &CorrectionSpec, targets: &[&str]) -> Result<WorkflowReport> {
        let graph = CorrectionGraph::build(&self.full_spec(spec))?;
        let mut wanted = HashSet::new();
        for target in targets {
            wanted.extend(graph.upstream_of(target)?);
            wanted.insert(target.to_string());
        }
        let order = graph.resolve()?.into_iter().filter(|n| wanted.contains(n)).collect();
        self.execute(&graph, order)
    }

    fn execute(&self, graph: &CorrectionGraph, order: Vec<String>) -> Result<WorkflowReport> {
        // Structural checks complete before any correction runs.
        for name in &order {
            if self.dataset(name).is_none() {
                return Err(CorrectionError::MissingDataset(name.clone()));
            }
        }

        tracing::info!(nodes = order.len(), parallel = self.config.parallel, "starting correction workflow");

        let mut outputs = NodeOutputs::new();
        let mut failures = Vec::new();
        if self.config.parallel {
            for level in levels(graph, &order) {
                let results: Vec<(&String, Result<NodeOutput>)> = level
                    .par_iter()
                    .map(|&name| (name, self.process_node(graph, name, &outputs, &failures)))
                    .collect();
                for (name, result) in results {
                    record(name, result, &mut outputs, &mut failures)?;
                }
            }
        } else {
            for name in &order {
                let result = self.process_node(graph, name, &outputs, &failures);
                record(name, result, &mut outputs, &mut failures)?;
            }
        }

        let report = WorkflowReport { order, outputs, failures };
        tracing::info!(
            processed = report.outputs.len(),
            failed = report.failures.len(),
            eliminated = report.total_eliminated(),
            "correction workflow complete"
        );
        Ok(report)
    }

    fn process_node(
        &self,
        graph: &CorrectionGraph,
        name: &str,
        outputs: &NodeOutputs,
        failures: &[NodeFailure],
    ) -> Result<NodeOutput> {
        let input = self.dataset(name).ok_or_else(|| CorrectionError::MissingDataset(name.to_string()))?;
        let control_names = graph.controls_of(name).unwrap_or_default();

        let mut controls = Vec::with_capacity(control_names.len());
        for &control in &control_names {
            match outputs.get(control) {
                Some(out) => controls.push(&out.outcome.corrected),
                None => {
                    debug_assert!(failures.iter().any(|f| f.node == control));
                    return Err(CorrectionError::Upstream { node: name.to_string(), control: control.to_string() });
                }
            }
        }

        let engine = CorrectionEngine::new(&self.criteria);
        let (mode, outcome) = match (controls.len(), self.config.control_mode) {
            (0, _) => (None, CorrectionOutcome { corrected: input.clone(), log: EliminationLog::new() }),
            (1, _) | (_, ControlMode::Sequential) => {
                (Some(ControlMode::Sequential), engine.apply_sequential(input, controls.iter().copied()))
            }
            (n, ControlMode::Synthetic) => {
                let mut synthetic = build_synthetic_control(&format!("{}_synthetic", name), controls.iter().copied())?;
                if self.config.synthetic_thinning {
                    synthetic = thin_by_phenotype(&synthetic, n)?;
                }
                (Some(ControlMode::Synthetic), engine.apply(input, &synthetic))
            }
        };

        tracing::info!(
            node = name,
            controls = ?control_names,
            eliminated = outcome.log.len(),
            remaining = outcome.corrected.len(),
            "processed node"
        );

        Ok(NodeOutput {
            name: name.to_string(),
            controls: control_names.iter().map(|c| c.to_string()).collect(),
            mode,
            input_particles: input.len(),
            outcome,
        })
    }
}

fn record(
    name: &str,
    result: Result<NodeOutput>,
    outputs: &mut NodeOutputs,
    failures: &mut Vec<NodeFailure>,
) -> Result<()> {
    match result {
        Ok(output) => outputs.insert(output),
        Err(e) => {
            tracing::warn!(node = name, error = %e, "node failed");
            failures.push(NodeFailure { node: name.to_string(), reason: e.to_string() });
            Ok(())
        }
    }
}

/// Groups `order` into dependency levels: a node's level is one more than the
/// highest level among its controls. Nodes within a level are independent and
/// keep their relative order.
fn levels<'o>(graph: &CorrectionGraph, order: &'o [String]) -> Vec<Vec<&'o String>> {
    let mut level_of: HashMap<&str, usize> = HashMap::with_capacity(order.len());
    let mut levels: Vec<Vec<&String>> = Vec::new();
    for name in order {
        let level = graph
            .controls_of(name)
            .unwrap_or_default()
            .iter()
            .filter_map(|c| level_of.get(c).map(|l| l + 1))
            .max()
            .unwrap_or(0);
        level_of.insert(name.as_str(), level);
        if levels.len() <= level {
            levels.resize_with(level + 1, Vec::new);
        }
        levels[level].push(name);
    }
    levels
}
