//! Structural validation of workflow graphs.
//!
//! [`validate`] runs a fixed set of structural rules against a
//! [`WorkflowGraph`](crate::graphs::WorkflowGraph) and returns a
//! [`ValidationReport`] splitting findings into blocking errors and advisory
//! warnings. The pass is pure: it never executes anything, never mutates the
//! graph, and the same graph always yields the same report.
//!
//! A graph is considered runnable when the report carries no errors. Warnings
//! (a missing trigger, orphaned nodes, no terminal node) describe graphs that
//! are legal but probably not what the author intended.
//!
//! # Quick Start
//!
//! ```
//! use stratoflow::graphs::{GraphNode, NodeRole, WorkflowGraph};
//! use stratoflow::validation::{validate, IssueCode};
//!
//! let graph = WorkflowGraph::builder()
//!     .add_node(GraphNode::new("in", "Webhook", NodeRole::Trigger))
//!     .add_node(GraphNode::new("out", "Notify", NodeRole::Output))
//!     .add_edge("in", "out")
//!     .build()
//!     .unwrap();
//!
//! let report = validate(&graph);
//! assert!(report.is_valid());
//!
//! let cyclic = WorkflowGraph::builder()
//!     .add_node(GraphNode::new("a", "a", NodeRole::Action))
//!     .add_node(GraphNode::new("b", "b", NodeRole::Action))
//!     .add_edge("a", "b")
//!     .add_edge("b", "a")
//!     .build()
//!     .unwrap();
//!
//! let report = validate(&cyclic);
//! assert!(!report.is_valid());
//! assert!(report.contains(IssueCode::CycleDetected));
//! ```

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::graphs::{NodeRole, WorkflowGraph};

/// Machine-readable code for a structural finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    CycleDetected,
    NoTrigger,
    MultipleTriggers,
    TriggerHasInput,
    OrphanNode,
    InvalidConnection,
    NoOutput,
    UnknownNode,
}

impl IssueCode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::CycleDetected => "CYCLE_DETECTED",
            IssueCode::NoTrigger => "NO_TRIGGER",
            IssueCode::MultipleTriggers => "MULTIPLE_TRIGGERS",
            IssueCode::TriggerHasInput => "TRIGGER_HAS_INPUT",
            IssueCode::OrphanNode => "ORPHAN_NODE",
            IssueCode::InvalidConnection => "INVALID_CONNECTION",
            IssueCode::NoOutput => "NO_OUTPUT",
            IssueCode::UnknownNode => "UNKNOWN_NODE",
        }
    }
}

impl std::fmt::Display for IssueCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a finding blocks execution or merely advises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One structural finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: IssueCode,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
}

impl ValidationIssue {
    fn error(code: IssueCode, message: impl Into<String>, node_id: Option<String>) -> Self {
        Self {
            code,
            severity: Severity::Error,
            message: message.into(),
            node_id,
        }
    }

    fn warning(code: IssueCode, message: impl Into<String>, node_id: Option<String>) -> Self {
        Self {
            code,
            severity: Severity::Warning,
            message: message.into(),
            node_id,
        }
    }
}

/// Outcome of one validation pass.
///
/// Errors block run initiation; warnings never do. Both lists preserve the
/// order in which the rules fired, so reports are stable across calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// True when no blocking errors were found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn errors(&self) -> &[ValidationIssue] {
        &self.errors
    }

    #[must_use]
    pub fn warnings(&self) -> &[ValidationIssue] {
        &self.warnings
    }

    /// All findings, errors first.
    pub fn issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.errors.iter().chain(self.warnings.iter())
    }

    /// True when any finding (either severity) carries `code`.
    #[must_use]
    pub fn contains(&self, code: IssueCode) -> bool {
        self.issues().any(|issue| issue.code == code)
    }

    fn push(&mut self, issue: ValidationIssue) {
        match issue.severity {
            Severity::Error => self.errors.push(issue),
            Severity::Warning => self.warnings.push(issue),
        }
    }
}

/// Runs every structural rule against `graph`.
///
/// The rules, in the order their findings appear in the report:
///
/// 1. Cycle detection (depth-first search with a recursion stack).
/// 2. Trigger cardinality: zero triggers warns, more than one errors.
/// 3. Trigger isolation: a trigger must not have incoming edges.
/// 4. Reachability from the trigger; skipped unless exactly one trigger
///    exists.
/// 5. Role placement: each node's position (first, intermediate, final) must
///    be permitted by its role; an isolated node passes with either end
///    permission.
/// 6. Terminal presence: a non-empty graph should have at least one node
///    without outgoing edges.
/// 7. Unknown references: every edge endpoint must be a declared node id.
pub fn validate(graph: &WorkflowGraph) -> ValidationReport {
    let mut report = ValidationReport::default();

    let known: FxHashSet<&str> = graph.nodes().iter().map(|n| n.id.as_str()).collect();

    // Deduplicated edges between declared nodes, declaration order preserved.
    let mut seen: FxHashSet<(&str, &str)> = FxHashSet::default();
    let mut adjacency: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
    let mut has_incoming: FxHashSet<&str> = FxHashSet::default();
    let mut has_outgoing: FxHashSet<&str> = FxHashSet::default();
    let mut unknown: Vec<&str> = Vec::new();
    let mut unknown_seen: FxHashSet<&str> = FxHashSet::default();
    for edge in graph.edges() {
        let (source, target) = (edge.source.as_str(), edge.target.as_str());
        for endpoint in [source, target] {
            if !known.contains(endpoint) && unknown_seen.insert(endpoint) {
                unknown.push(endpoint);
            }
        }
        if !known.contains(source) || !known.contains(target) {
            continue;
        }
        if !seen.insert((source, target)) {
            continue;
        }
        adjacency.entry(source).or_default().push(target);
        has_incoming.insert(target);
        has_outgoing.insert(source);
    }

    // Rule 1: cycle detection.
    for cycle_node in cycle_members(graph, &adjacency) {
        report.push(ValidationIssue::error(
            IssueCode::CycleDetected,
            format!("cycle detected involving node '{cycle_node}'"),
            Some(cycle_node),
        ));
    }

    // Rules 2 and 3: trigger cardinality and isolation.
    let triggers: Vec<&str> = graph
        .nodes()
        .iter()
        .filter(|n| n.role.is_trigger())
        .map(|n| n.id.as_str())
        .collect();
    match triggers.len() {
        0 => report.push(ValidationIssue::warning(
            IssueCode::NoTrigger,
            "workflow has no trigger node",
            None,
        )),
        1 => {}
        n => report.push(ValidationIssue::error(
            IssueCode::MultipleTriggers,
            format!("workflow has {n} trigger nodes ({}), expected exactly one", triggers.join(", ")),
            None,
        )),
    }
    for trigger in &triggers {
        if has_incoming.contains(trigger) {
            report.push(ValidationIssue::error(
                IssueCode::TriggerHasInput,
                format!("trigger node '{trigger}' has incoming connections"),
                Some((*trigger).to_string()),
            ));
        }
    }

    // Rule 4: reachability, only meaningful with a single entry point.
    if triggers.len() == 1 {
        let mut visited: FxHashSet<&str> = FxHashSet::default();
        let mut queue: VecDeque<&str> = VecDeque::new();
        visited.insert(triggers[0]);
        queue.push_back(triggers[0]);
        while let Some(id) = queue.pop_front() {
            for next in adjacency.get(id).into_iter().flatten() {
                if visited.insert(*next) {
                    queue.push_back(*next);
                }
            }
        }
        for node in graph.nodes() {
            if !visited.contains(node.id.as_str()) {
                report.push(ValidationIssue::warning(
                    IssueCode::OrphanNode,
                    format!("node '{}' is unreachable from the trigger", node.id),
                    Some(node.id.clone()),
                ));
            }
        }
    }

    // Rule 5: role placement. An isolated node occupies both the first and
    // the final position; either end permission qualifies it.
    for node in graph.nodes() {
        let placement = node.role.placement();
        let first = !has_incoming.contains(node.id.as_str());
        let last = !has_outgoing.contains(node.id.as_str());
        let violation = if first && last {
            if placement.allows_isolated() {
                None
            } else {
                Some("cannot stand alone in the workflow")
            }
        } else if first && !placement.first {
            Some("cannot start the workflow")
        } else if last && !placement.last {
            Some("cannot end the workflow")
        } else if !first && !last && !placement.middle {
            Some("cannot appear between other nodes")
        } else {
            None
        };
        if let Some(position) = violation {
            report.push(ValidationIssue::error(
                IssueCode::InvalidConnection,
                format!("node '{}' with role '{}' {position}", node.id, node.role),
                Some(node.id.clone()),
            ));
        }
    }

    // Rule 6: terminal presence, vacuous on an empty graph.
    if !graph.is_empty() {
        let has_terminal = graph
            .nodes()
            .iter()
            .any(|n| !has_outgoing.contains(n.id.as_str()));
        if !has_terminal {
            report.push(ValidationIssue::warning(
                IssueCode::NoOutput,
                "workflow has no terminal node",
                None,
            ));
        }
    }

    // Rule 7: unknown references.
    for id in unknown {
        report.push(ValidationIssue::error(
            IssueCode::UnknownNode,
            format!("edge references undeclared node '{id}'"),
            Some(id.to_string()),
        ));
    }

    tracing::debug!(
        workflow_id = %graph.workflow_id(),
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "validated workflow graph"
    );
    report
}

/// Nodes at which a back edge was found, in deterministic discovery order.
fn cycle_members(graph: &WorkflowGraph, adjacency: &FxHashMap<&str, Vec<&str>>) -> Vec<String> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let mut color: FxHashMap<&str, Color> = graph
        .nodes()
        .iter()
        .map(|n| (n.id.as_str(), Color::White))
        .collect();
    let mut found: Vec<String> = Vec::new();
    let mut found_seen: FxHashSet<&str> = FxHashSet::default();

    for root in graph.nodes() {
        if color[root.id.as_str()] != Color::White {
            continue;
        }
        let mut stack: Vec<(&str, usize)> = vec![(root.id.as_str(), 0)];
        color.insert(root.id.as_str(), Color::Gray);
        while !stack.is_empty() {
            let top = stack.len() - 1;
            let (id, next_index) = stack[top];
            let neighbors = adjacency.get(id).map(Vec::as_slice).unwrap_or_default();
            if next_index < neighbors.len() {
                stack[top].1 = next_index + 1;
                let next = neighbors[next_index];
                match color[next] {
                    Color::White => {
                        color.insert(next, Color::Gray);
                        stack.push((next, 0));
                    }
                    Color::Gray => {
                        // Back edge: `next` is still on the recursion stack.
                        if found_seen.insert(next) {
                            found.push(next.to_string());
                        }
                    }
                    Color::Black => {}
                }
            } else {
                color.insert(id, Color::Black);
                stack.pop();
            }
        }
    }

    found
}
