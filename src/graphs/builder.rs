//! Fluent construction of [`WorkflowGraph`] values.
//!
//! The builder is the only way to obtain a graph, so the invariants the rest
//! of the crate relies on (unique node ids, resolved roles) hold by
//! construction.
//!
//! # Examples
//!
//! ```
//! use stratoflow::graphs::{GraphNode, NodeRole, WorkflowGraph};
//!
//! let graph = WorkflowGraph::builder()
//!     .with_name("fetch and fan out")
//!     .add_node(GraphNode::new("start", "Manual start", NodeRole::Trigger))
//!     .add_node(GraphNode::new("fetch", "Fetch users", NodeRole::Action))
//!     .add_node(GraphNode::new("render", "Render table", NodeRole::Output))
//!     .add_edge("start", "fetch")
//!     .add_edge("fetch", "render")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(graph.node_count(), 3);
//! assert_eq!(graph.edge_count(), 2);
//! ```

use miette::Diagnostic;
use rustc_hash::FxHashSet;
use thiserror::Error;

use super::model::{GraphEdge, GraphNode, WorkflowGraph};
use crate::utils::ids::new_workflow_id;

/// Error produced when a graph cannot be assembled.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphBuildError {
    /// Two nodes were registered under the same id.
    #[error("duplicate node id: {id}")]
    #[diagnostic(
        code(stratoflow::graphs::duplicate_node),
        help("node ids must be unique within one workflow")
    )]
    DuplicateNode { id: String },
}

/// Builder for [`WorkflowGraph`] with a consuming fluent API.
///
/// Edges may be added before the nodes they mention; resolution happens at
/// [`build`](Self::build) (duplicate ids) and during validation (unknown
/// ids). An omitted workflow id is replaced with a fresh UUID.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    workflow_id: Option<String>,
    name: Option<String>,
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
}

impl GraphBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the workflow identity used by registry history queries.
    #[must_use]
    pub fn with_workflow_id(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = Some(workflow_id.into());
        self
    }

    /// Sets the human-readable workflow name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Registers a node. Duplicate ids are rejected at [`build`](Self::build).
    #[must_use]
    pub fn add_node(mut self, node: GraphNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Adds a dependency edge: `target` consumes `source`'s output.
    #[must_use]
    pub fn add_edge(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        let edge = GraphEdge::new(source, target);
        if edge.source == edge.target {
            tracing::warn!(node = %edge.source, "self-referencing edge will fail validation");
        }
        self.edges.push(edge);
        self
    }

    /// Assembles the graph.
    ///
    /// # Errors
    ///
    /// Returns [`GraphBuildError::DuplicateNode`] when two nodes share an id.
    pub fn build(self) -> Result<WorkflowGraph, GraphBuildError> {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(GraphBuildError::DuplicateNode {
                    id: node.id.clone(),
                });
            }
        }

        Ok(WorkflowGraph::from_parts(
            self.workflow_id.unwrap_or_else(new_workflow_id),
            self.name.unwrap_or_default(),
            self.nodes,
            self.edges,
        ))
    }
}
