//! Workflow scheduling and execution.
//!
//! The moving parts:
//!
//! - [`SchedulerConfig`]: retry, timeout, parallelism, and pacing knobs.
//! - [`StepExecutor`]: the injected contract that actually runs a node.
//! - [`Scheduler`]: validates and plans a graph, then drives runs over it.
//! - [`RunHandle`]: cooperative pause, resume, and cancel for a started run.
//!
//! See the `runner` module docs for the execution model and a Quick Start.

pub mod config;
pub mod contract;
pub mod control;
pub mod runner;

pub use config::SchedulerConfig;
pub use contract::{StepExecutor, StepExecutorError};
pub use control::RunHandle;
pub use runner::{ExecuteError, Scheduler};
