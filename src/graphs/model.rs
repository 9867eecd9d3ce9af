//! Immutable workflow graph model.
//!
//! A [`WorkflowGraph`] is the caller-supplied description of one workflow:
//! nodes (id, display name, role, opaque payload) and directed dependency
//! edges. Construct one through [`GraphBuilder`](super::GraphBuilder); after
//! that it is read-only for the lifetime of any run over it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::roles::NodeRole;

/// One unit of work in a workflow.
///
/// The `payload` is whatever the editor attached to the block (request
/// parameters, expressions, template text). The execution core never looks
/// inside it; it is handed to the injected step executor verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Unique id within the workflow.
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// Structural role, resolved at construction.
    pub role: NodeRole,
    /// Opaque work description; defaults to JSON null.
    #[serde(default)]
    pub payload: Value,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: NodeRole) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
            payload: Value::Null,
        }
    }

    /// Attaches the opaque work description.
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Directed dependency: `target` consumes `source`'s output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

impl GraphEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// An immutable workflow description: nodes plus dependency edges.
///
/// Node ids are expected to be unique; [`GraphBuilder`](super::GraphBuilder)
/// enforces this at build time. Edges may reference ids that were never
/// declared: the validator reports those as blocking issues and the layering
/// pass skips them (see the module docs on `layering`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowGraph {
    workflow_id: String,
    name: String,
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
}

impl WorkflowGraph {
    /// Starts a fluent builder.
    #[must_use]
    pub fn builder() -> super::GraphBuilder {
        super::GraphBuilder::new()
    }

    pub(crate) fn from_parts(
        workflow_id: String,
        name: String,
        nodes: Vec<GraphNode>,
        edges: Vec<GraphEdge>,
    ) -> Self {
        Self {
            workflow_id,
            name,
            nodes,
            edges,
        }
    }

    #[must_use]
    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    #[must_use]
    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Edges whose target is `id`.
    pub fn incoming<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a GraphEdge> {
        self.edges.iter().filter(move |e| e.target == id)
    }

    /// Edges whose source is `id`.
    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a GraphEdge> {
        self.edges.iter().filter(move |e| e.source == id)
    }
}
