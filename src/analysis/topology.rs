//! Correction graph and dependency resolution.
//!
//! A node is a dataset; its controls are the datasets that must be fully
//! corrected before it can be processed. Edges point Node -> Control.
use crate::error::{CorrectionError, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;

pub type ControlList = SmallVec<[String; 2]>;

/// A named dataset and the ordered controls it is corrected against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionNode {
    pub name: String,
    pub controls: ControlList,
}

impl CorrectionNode {
    pub fn new<S: Into<String>>(name: impl Into<String>, controls: impl IntoIterator<Item = S>) -> Self {
        Self { name: name.into(), controls: controls.into_iter().map(Into::into).collect() }
    }
}

/// The declared correction graph, in declaration order.
///
/// Deserializes from a JSON object whose values are either a single control
/// name or a list of them; key order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrectionSpec {
    entries: Vec<CorrectionNode>,
}

impl CorrectionSpec {
    pub fn new() -> Self { Self::default() }

    pub fn with(mut self, name: &str, controls: &[&str]) -> Self {
        self.push(CorrectionNode::new(name, controls.iter().copied()));
        self
    }

    pub fn push(&mut self, node: CorrectionNode) { self.entries.push(node); }
    pub fn entries(&self) -> &[CorrectionNode] { &self.entries }
    pub fn contains(&self, name: &str) -> bool { self.entries.iter().any(|n| n.name == name) }
}

impl<'de> Deserialize<'de> for CorrectionSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Controls {
            One(String),
            Many(Vec<String>),
        }

        struct SpecVisitor;

        impl<'de> Visitor<'de> for SpecVisitor {
            type Value = CorrectionSpec;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of dataset name to a control name or list of control names")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
                let mut spec = CorrectionSpec::new();
                while let Some((name, controls)) = map.next_entry::<String, Controls>()? {
                    if spec.contains(&name) {
                        return Err(de::Error::custom(format!("node '{}' is declared more than once", name)));
                    }
                    let controls: ControlList = match controls {
                        Controls::One(c) => SmallVec::from_elem(c, 1),
                        Controls::Many(cs) => SmallVec::from_vec(cs),
                    };
                    spec.push(CorrectionNode { name, controls });
                }
                Ok(spec)
            }
        }

        deserializer.deserialize_map(SpecVisitor)
    }
}

/// Per-node resolution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitState {
    Pending,
    InProgress,
    Resolved,
    Cyclic,
}

/// Validated correction graph. Every control refers to a declared node.
#[derive(Debug, Clone)]
pub struct CorrectionGraph {
    graph: DiGraph<String, ()>,
    index_map: HashMap<String, NodeIndex>,
    // Declared control order per node; petgraph's neighbour order is not it.
    controls: Vec<SmallVec<[NodeIndex; 2]>>,
}

impl CorrectionGraph {
    /// Builds the graph from a wholesale declaration.
    ///
    /// Fails on duplicate node names and on controls that name no declared node.
    /// Unknown dependencies are checked for every node before anything else.
    pub fn build(spec: &CorrectionSpec) -> Result<Self> {
        let mut graph = DiGraph::with_capacity(spec.entries.len(), 0);
        let mut index_map = HashMap::with_capacity(spec.entries.len());

        for node in &spec.entries {
            if index_map.contains_key(&node.name) {
                return Err(CorrectionError::DuplicateNode { node: node.name.clone() });
            }
            let idx = graph.add_node(node.name.clone());
            index_map.insert(node.name.clone(), idx);
        }

        let mut controls = Vec::with_capacity(spec.entries.len());
        for node in &spec.entries {
            let from = index_map[&node.name];
            let mut targets = SmallVec::new();
            for control in &node.controls {
                let to = *index_map.get(control).ok_or_else(|| CorrectionError::UnknownDependency {
                    node: node.name.clone(),
                    dependency: control.clone(),
                })?;
                graph.add_edge(from, to, ());
                targets.push(to);
            }
            controls.push(targets);
        }

        Ok(Self { graph, index_map, controls })
    }

    pub fn name(&self, idx: NodeIndex) -> &str { &self.graph[idx] }

    pub fn controls_of(&self, name: &str) -> Option<Vec<&str>> {
        let idx = *self.index_map.get(name)?;
        Some(self.controls[idx.index()].iter().map(|&c| self.name(c)).collect())
    }

    /// Returns every node exactly once, each after all of its controls.
    ///
    /// Depth-first post-order over nodes in declaration order and controls in
    /// declared order, so identical declarations always give identical orders.
    pub fn resolve(&self) -> Result<Vec<String>> {
        let count = self.graph.node_count();
        let mut state = vec![VisitState::Pending; count];
        let mut stack = Vec::new();
        let mut order = Vec::with_capacity(count);

        for idx in self.graph.node_indices() {
            if state[idx.index()] == VisitState::Pending {
                self.visit(idx, &mut state, &mut stack, &mut order)?;
            }
        }

        Ok(order.into_iter().map(|idx| self.graph[idx].clone()).collect())
    }

    fn visit(
        &self,
        node: NodeIndex,
        state: &mut [VisitState],
        stack: &mut Vec<NodeIndex>,
        order: &mut Vec<NodeIndex>,
    ) -> Result<()> {
        let idx = node.index();

        match state[idx] {
            VisitState::Resolved => return Ok(()),
            VisitState::InProgress | VisitState::Cyclic => {
                state[idx] = VisitState::Cyclic;
                let start = stack.iter().position(|&n| n == node).unwrap_or(0);
                let mut cycle: Vec<String> =
                    stack[start..].iter().map(|&n| self.graph[n].clone()).collect();
                cycle.push(self.graph[node].clone());
                return Err(CorrectionError::CyclicDependency { cycle });
            }
            VisitState::Pending => state[idx] = VisitState::InProgress,
        }

        stack.push(node);
        for &control in &self.controls[idx] {
            self.visit(control, state, stack, order)?;
        }
        stack.pop();

        state[idx] = VisitState::Resolved;
        order.push(node);
        Ok(())
    }

    /// Nodes that must be produced before `name` (transitively), in resolution order.
    pub fn upstream_of(&self, name: &str) -> Result<Vec<String>> {
        let start = *self.index_map.get(name).ok_or_else(|| CorrectionError::UnknownDependency {
            node: name.to_string(),
            dependency: name.to_string(),
        })?;

        let mut reachable = vec![false; self.graph.node_count()];
        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(n) = dfs.next(&self.graph) {
            reachable[n.index()] = true;
        }
        reachable[start.index()] = false;

        Ok(self
            .resolve()?
            .into_iter()
            .filter(|n| reachable[self.index_map[n].index()])
            .collect())
    }
}

/// Resolves a declaration straight to a processing order.
pub fn resolve_order(spec: &CorrectionSpec) -> Result<Vec<String>> {
    CorrectionGraph::build(spec)?.resolve()
}
