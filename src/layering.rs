//! Kahn-style levelling of a workflow graph.
//!
//! A [`Layering`] groups every node into ordered levels such that every
//! edge's source sits in a strictly lower level than its target, and a node's
//! level is one greater than the maximum level of its direct dependencies
//! (sources sit at level 0). Nodes sharing a level have no dependency
//! relationship and may run concurrently.
//!
//! The plan is built fresh for each run and is also usable standalone (the
//! validator cross-checks its cycle verdict against the DFS pass in
//! `validation`).
//!
//! Two deliberate behaviors to be aware of:
//!
//! - Edges whose endpoints were never declared as nodes are skipped with a
//!   warning log. The validator reports them as blocking issues; layering
//!   stays tolerant so the failure mode remains observable instead of being
//!   silently repaired.
//! - Node ids inside each level are ordered lexicographically, so the same
//!   graph always produces the same plan.
//!
//! # Examples
//!
//! ```
//! use stratoflow::graphs::{GraphNode, NodeRole, WorkflowGraph};
//! use stratoflow::layering::Layering;
//!
//! let graph = WorkflowGraph::builder()
//!     .add_node(GraphNode::new("a", "a", NodeRole::Trigger))
//!     .add_node(GraphNode::new("b", "b", NodeRole::Action))
//!     .add_node(GraphNode::new("c", "c", NodeRole::Action))
//!     .add_edge("a", "b")
//!     .add_edge("a", "c")
//!     .build()
//!     .unwrap();
//!
//! let plan = Layering::plan(&graph).unwrap();
//! assert_eq!(plan.levels(), &[vec!["a".to_string()], vec!["b".into(), "c".into()]]);
//! assert_eq!(plan.level_of("c"), Some(1));
//! ```

use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::graphs::WorkflowGraph;

/// Per-node slice of the plan: who it waits on, who waits on it, and where
/// it sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerEntry {
    /// Ids this node depends on (deduplicated, sorted).
    pub dependencies: Vec<String>,
    /// Ids depending on this node (deduplicated, sorted).
    pub dependents: Vec<String>,
    /// 0-based level index.
    pub level: usize,
}

/// Failure to place every node into a level.
#[derive(Debug, Error, Diagnostic)]
pub enum LayeringError {
    /// One or more dependency cycles left nodes unplaced.
    #[error("cyclic dependencies left {} node(s) unplaced: {unplaced:?}", unplaced.len())]
    #[diagnostic(
        code(stratoflow::layering::cycle_residue),
        help("run the structural validator to locate the cycle")
    )]
    CycleResidue { unplaced: Vec<String> },
}

/// The levelled execution plan for one graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Layering {
    levels: Vec<Vec<String>>,
    entries: FxHashMap<String, LayerEntry>,
}

impl Layering {
    /// Computes the plan for `graph`.
    ///
    /// # Errors
    ///
    /// Returns [`LayeringError::CycleResidue`] when the frontier sweep
    /// drains before every node is placed, naming the leftover nodes.
    pub fn plan(graph: &WorkflowGraph) -> Result<Self, LayeringError> {
        let known: FxHashSet<&str> = graph.nodes().iter().map(|n| n.id.as_str()).collect();

        let mut in_degree: FxHashMap<&str, usize> = FxHashMap::default();
        let mut dependencies: FxHashMap<&str, Vec<String>> = FxHashMap::default();
        let mut dependents: FxHashMap<&str, Vec<String>> = FxHashMap::default();
        for id in &known {
            in_degree.insert(*id, 0);
        }

        let mut seen: FxHashSet<(&str, &str)> = FxHashSet::default();
        for edge in graph.edges() {
            let (source, target) = (edge.source.as_str(), edge.target.as_str());
            if !known.contains(source) || !known.contains(target) {
                tracing::warn!(%source, %target, "edge references an undeclared node, skipping");
                continue;
            }
            // Parallel edges between the same pair count once.
            if !seen.insert((source, target)) {
                continue;
            }
            *in_degree.entry(target).or_insert(0) += 1;
            dependencies.entry(target).or_default().push(source.to_string());
            dependents.entry(source).or_default().push(target.to_string());
        }

        let mut frontier: Vec<String> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| (*id).to_string())
            .collect();

        let mut levels: Vec<Vec<String>> = Vec::new();
        let mut level_of: FxHashMap<String, usize> = FxHashMap::default();
        let mut placed = 0usize;

        while !frontier.is_empty() {
            frontier.sort();
            let level_index = levels.len();
            let mut next: Vec<String> = Vec::new();
            for id in &frontier {
                level_of.insert(id.clone(), level_index);
                for dependent in dependents.get(id.as_str()).into_iter().flatten() {
                    if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                        *degree = degree.saturating_sub(1);
                        if *degree == 0 {
                            next.push(dependent.clone());
                        }
                    }
                }
            }
            placed += frontier.len();
            levels.push(std::mem::take(&mut frontier));
            frontier = next;
        }

        if placed < known.len() {
            let mut unplaced: Vec<String> = known
                .iter()
                .filter(|id| !level_of.contains_key(**id))
                .map(|id| (*id).to_string())
                .collect();
            unplaced.sort();
            return Err(LayeringError::CycleResidue { unplaced });
        }

        let mut entries: FxHashMap<String, LayerEntry> = FxHashMap::default();
        for (id, level) in &level_of {
            let mut deps = dependencies.remove(id.as_str()).unwrap_or_default();
            let mut dents = dependents.remove(id.as_str()).unwrap_or_default();
            deps.sort();
            dents.sort();
            entries.insert(
                id.clone(),
                LayerEntry {
                    dependencies: deps,
                    dependents: dents,
                    level: *level,
                },
            );
        }

        Ok(Self { levels, entries })
    }

    /// Levels in execution order; each level's ids are sorted.
    #[must_use]
    pub fn levels(&self) -> &[Vec<String>] {
        &self.levels
    }

    #[must_use]
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Total number of placed nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn level_of(&self, id: &str) -> Option<usize> {
        self.entries.get(id).map(|e| e.level)
    }

    #[must_use]
    pub fn entry(&self, id: &str) -> Option<&LayerEntry> {
        self.entries.get(id)
    }
}
