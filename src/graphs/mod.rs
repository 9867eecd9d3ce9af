//! Workflow graph definition: nodes, edges, roles, and the builder.
//!
//! This module is the data boundary between the editor and the execution
//! core. The editor hands over a [`WorkflowGraph`]; everything downstream
//! (validation, layering, scheduling) reads it without mutating it.
//!
//! # Quick Start
//!
//! ```
//! use stratoflow::graphs::{GraphNode, NodeRole, WorkflowGraph};
//! use serde_json::json;
//!
//! let graph = WorkflowGraph::builder()
//!     .with_workflow_id("wf-42")
//!     .with_name("sync contacts")
//!     .add_node(GraphNode::new("trigger", "On demand", NodeRole::Trigger))
//!     .add_node(
//!         GraphNode::new("pull", "Pull contacts", NodeRole::Action)
//!             .with_payload(json!({"endpoint": "/contacts"})),
//!     )
//!     .add_edge("trigger", "pull")
//!     .build()
//!     .unwrap();
//!
//! assert!(graph.contains("pull"));
//! assert_eq!(graph.node("pull").unwrap().role, NodeRole::Action);
//! ```

mod builder;
mod model;
mod roles;

pub use builder::{GraphBuildError, GraphBuilder};
pub use model::{GraphEdge, GraphNode, WorkflowGraph};
pub use roles::{NodeRole, RolePlacement};
