//! The injected step execution contract.

use async_trait::async_trait;
use serde_json::Value;

use crate::runs::StepInput;

/// Boxed error an executor may return from an attempt.
pub type StepExecutorError = Box<dyn std::error::Error + Send + Sync>;

/// Executes one node of a workflow.
///
/// The scheduler treats a step as an opaque async operation: it hands the
/// executor the node id and the recorded outputs of every dependency, and
/// takes back either the step's output value or an error. What "executing a
/// node" means (an HTTP call, a template render, a shell command) is entirely
/// the implementor's business, as is looking up the node's payload from the
/// graph it was built against.
///
/// A failing attempt is re-invoked according to the scheduler's retry
/// policy, so implementations should be idempotent or tolerate repetition.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use serde_json::{json, Value};
/// use stratoflow::runs::StepInput;
/// use stratoflow::scheduler::{StepExecutor, StepExecutorError};
///
/// struct SumExecutor;
///
/// #[async_trait]
/// impl StepExecutor for SumExecutor {
///     async fn execute(&self, node_id: &str, input: StepInput) -> Result<Value, StepExecutorError> {
///         let total: i64 = input.values().filter_map(Value::as_i64).sum();
///         Ok(json!({ "node": node_id, "total": total }))
///     }
/// }
/// ```
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Runs the node once. `input` maps each dependency's node id to the
    /// output that dependency recorded.
    async fn execute(&self, node_id: &str, input: StepInput) -> Result<Value, StepExecutorError>;
}
