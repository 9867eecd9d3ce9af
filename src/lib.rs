//! # Stratoflow: Workflow Execution Core
//!
//! Stratoflow executes the dependency graphs behind a visual workflow
//! editor. The editor describes a workflow as blocks and connections; this
//! crate validates that description, plans it into dependency levels, and
//! runs it level by level with bounded parallelism, retries, timeouts, and
//! cooperative pause and cancel. What a block actually *does* is injected
//! through a single async trait, so the core stays transport and
//! side-effect agnostic.
//!
//! ## Core Concepts
//!
//! - **Graph**: Immutable workflow description (nodes with roles, dependency edges)
//! - **Validation**: Structural rules split into blocking errors and advisory warnings
//! - **Layering**: Kahn-style planning into levels of mutually independent nodes
//! - **Scheduler**: Level-synchronized async execution of a planned graph
//! - **Runs**: Per-execution records with one step per node, kept in a registry
//! - **Events**: Broadcast stream of run and step transitions for live observers
//!
//! ## Quick Start
//!
//! ### Describing and validating a workflow
//!
//! ```
//! use stratoflow::graphs::{GraphNode, NodeRole, WorkflowGraph};
//! use stratoflow::validation::validate;
//!
//! let graph = WorkflowGraph::builder()
//!     .with_workflow_id("wf-42")
//!     .with_name("Welcome email")
//!     .add_node(GraphNode::new("form", "Form submitted", NodeRole::Trigger))
//!     .add_node(GraphNode::new("send", "Send email", NodeRole::Action))
//!     .add_node(GraphNode::new("log", "Log result", NodeRole::Output))
//!     .add_edge("form", "send")
//!     .add_edge("send", "log")
//!     .build()?;
//!
//! let report = validate(&graph);
//! assert!(report.is_valid());
//! # Ok::<(), stratoflow::graphs::GraphBuildError>(())
//! ```
//!
//! ### Planning execution levels
//!
//! ```
//! use stratoflow::graphs::{GraphNode, NodeRole, WorkflowGraph};
//! use stratoflow::layering::Layering;
//!
//! # fn main() -> miette::Result<()> {
//! let graph = WorkflowGraph::builder()
//!     .with_workflow_id("wf-7")
//!     .with_name("Fan out")
//!     .add_node(GraphNode::new("a", "A", NodeRole::Trigger))
//!     .add_node(GraphNode::new("b", "B", NodeRole::Action))
//!     .add_node(GraphNode::new("c", "C", NodeRole::Action))
//!     .add_node(GraphNode::new("d", "D", NodeRole::Output))
//!     .add_edge("a", "b")
//!     .add_edge("a", "c")
//!     .add_edge("b", "d")
//!     .add_edge("c", "d")
//!     .build()?;
//!
//! let layering = Layering::plan(&graph)?;
//! assert_eq!(layering.levels(), &[
//!     vec!["a".to_string()],
//!     vec!["b".to_string(), "c".to_string()],
//!     vec!["d".to_string()],
//! ]);
//! # Ok(())
//! # }
//! ```
//!
//! Executing a graph needs an async runtime and a step executor; see the
//! Quick Start in the [`scheduler`] module docs.
//!
//! ## Error Handling
//!
//! Every fallible surface returns a dedicated error type implementing
//! [`miette::Diagnostic`] with a stable `stratoflow::*` code and, where it
//! helps, a `help()` hint. Structural problems in a graph are *not* errors
//! at build time: the builder only rejects duplicate node ids, while the
//! structural rules live in [`validation`] and report through a
//! [`ValidationReport`](validation::ValidationReport) so an editor can show
//! all findings at once.
//!
//! ## Module Guide
//!
//! - [`graphs`] - Workflow graph model and fluent builder
//! - [`validation`] - Structural rule checks and the issue report
//! - [`layering`] - Dependency levelling over a graph
//! - [`scheduler`] - Level-synchronized execution, retries, pause and cancel
//! - [`runs`] - Run and step records
//! - [`registry`] - In-memory run history
//! - [`events`] - Execution event types and the broadcast hub
//! - [`telemetry`] - Tracing bootstrap for binaries and tests
//! - [`utils`] - Small shared helpers

pub mod events;
pub mod graphs;
pub mod layering;
pub mod registry;
pub mod runs;
pub mod scheduler;
pub mod telemetry;
pub mod utils;
pub mod validation;
