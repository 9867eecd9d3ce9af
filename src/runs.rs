//! Run and step records.
//!
//! A [`Run`] is the complete account of one workflow execution: identity,
//! trigger, overall status, timing, and one [`ExecutionStep`] per graph node.
//! The scheduler owns the live record and mutates it from a single driving
//! task; everything observers receive (registry reads, event payloads) is a
//! cloned snapshot, so these types are plain data with public fields.
//!
//! Step transitions are monotonic. A step enters `running` at most once per
//! attempt, `duration_ms` is set only when the step leaves `running`, and a
//! terminal status is never overwritten. The mutating helpers are
//! crate-private so the scheduler is the only writer.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::graphs::{GraphNode, WorkflowGraph};
use crate::utils::ids;

/// Input handed to a step executor: dependency node id to recorded output.
pub type StepInput = FxHashMap<String, Value>;

/// Overall status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Paused,
    Success,
    Error,
    Cancelled,
}

impl RunStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Paused => "paused",
            RunStatus::Success => "success",
            RunStatus::Error => "error",
            RunStatus::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Success | RunStatus::Error | RunStatus::Cancelled
        )
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a single step.
///
/// `skipped` is a reporting state: the scheduler records steps of
/// never-started levels as `queued`, and [`ExecutionStep::effective_status`]
/// maps `queued` to `skipped` once the run is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Queued,
    Running,
    Success,
    Error,
    Cancelled,
    Skipped,
}

impl StepStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Queued => "queued",
            StepStatus::Running => "running",
            StepStatus::Success => "success",
            StepStatus::Error => "error",
            StepStatus::Cancelled => "cancelled",
            StepStatus::Skipped => "skipped",
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Success | StepStatus::Error | StepStatus::Cancelled | StepStatus::Skipped
        )
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a run started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunTrigger {
    Manual {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user: Option<String>,
    },
    Webhook {
        source: String,
    },
    Schedule {
        expression: String,
    },
}

impl RunTrigger {
    #[must_use]
    pub fn manual() -> Self {
        RunTrigger::Manual { user: None }
    }

    #[must_use]
    pub fn manual_by(user: impl Into<String>) -> Self {
        RunTrigger::Manual {
            user: Some(user.into()),
        }
    }

    #[must_use]
    pub fn webhook(source: impl Into<String>) -> Self {
        RunTrigger::Webhook {
            source: source.into(),
        }
    }

    #[must_use]
    pub fn schedule(expression: impl Into<String>) -> Self {
        RunTrigger::Schedule {
            expression: expression.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            RunTrigger::Manual { .. } => "manual",
            RunTrigger::Webhook { .. } => "webhook",
            RunTrigger::Schedule { .. } => "schedule",
        }
    }
}

impl Default for RunTrigger {
    fn default() -> Self {
        RunTrigger::manual()
    }
}

/// Machine code on a recorded step error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepErrorCode {
    Timeout,
    ExecutionFailed,
}

impl StepErrorCode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StepErrorCode::Timeout => "TIMEOUT",
            StepErrorCode::ExecutionFailed => "EXECUTION_FAILED",
        }
    }
}

/// A step failure.
///
/// While retries remain, failures circulate as retryable values in logs and
/// `step_retrying` payloads. On exhaustion the last failure is folded into a
/// terminal, non-retryable `EXECUTION_FAILED` record via [`Self::into_terminal`];
/// that is the only shape ever stored on [`ExecutionStep::error`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepError {
    pub code: StepErrorCode,
    pub message: String,
    pub retryable: bool,
}

impl StepError {
    /// A retryable failure reported by the executor itself.
    #[must_use]
    pub fn execution(message: impl Into<String>) -> Self {
        Self {
            code: StepErrorCode::ExecutionFailed,
            message: message.into(),
            retryable: true,
        }
    }

    /// A retryable failure injected by the scheduler when an attempt exceeds
    /// the configured step timeout.
    #[must_use]
    pub fn timeout(elapsed_ms: u64) -> Self {
        Self {
            code: StepErrorCode::Timeout,
            message: format!("step timed out after {elapsed_ms} ms"),
            retryable: true,
        }
    }

    /// Folds the last failure of an exhausted retry loop into the terminal
    /// record kept on the step.
    #[must_use]
    pub fn into_terminal(self) -> Self {
        Self {
            code: StepErrorCode::ExecutionFailed,
            message: self.message,
            retryable: false,
        }
    }
}

/// One timestamped line in a step's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepLogEntry {
    pub at: DateTime<Utc>,
    pub message: String,
}

impl StepLogEntry {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            message: message.into(),
        }
    }
}

/// Per-node execution record, exactly one per node per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub node_id: String,
    pub node_name: String,
    pub status: StepStatus,
    /// When the step was dispatched into its level. With a parallelism cap
    /// below the level width the first attempt may still be waiting for a
    /// slot at this point; the `step_started` event marks the attempt itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Wall time from dispatch to settling, including any wait for a
    /// parallelism slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<StepInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StepError>,
    pub retry_count: u32,
    pub logs: Vec<StepLogEntry>,
}

impl ExecutionStep {
    pub(crate) fn queued(node: &GraphNode) -> Self {
        Self {
            node_id: node.id.clone(),
            node_name: node.name.clone(),
            status: StepStatus::Queued,
            started_at: None,
            finished_at: None,
            duration_ms: None,
            input: None,
            output: None,
            error: None,
            retry_count: 0,
            logs: Vec::new(),
        }
    }

    /// Status as reported once the run's fate is known: `queued` steps of a
    /// terminal run were never going to execute and read as `skipped`.
    #[must_use]
    pub fn effective_status(&self, run_terminal: bool) -> StepStatus {
        if run_terminal && self.status == StepStatus::Queued {
            StepStatus::Skipped
        } else {
            self.status
        }
    }

    pub(crate) fn log(&mut self, message: impl Into<String>) {
        self.logs.push(StepLogEntry::new(message));
    }

    /// Enters `running` at dispatch, recording the input snapshot. Dispatch
    /// can precede the first attempt when the level is wider than the
    /// parallelism cap.
    pub(crate) fn begin(&mut self, input: StepInput) {
        self.status = StepStatus::Running;
        self.started_at = Some(Utc::now());
        self.input = Some(input);
        self.log("step started");
    }

    pub(crate) fn succeed(&mut self, output: Value) {
        self.status = StepStatus::Success;
        self.close();
        self.output = Some(output);
        self.log("step completed");
    }

    pub(crate) fn fail(&mut self, error: StepError) {
        self.status = StepStatus::Error;
        self.close();
        self.log(format!(
            "step failed ({}): {}",
            error.code.as_str(),
            error.message
        ));
        self.error = Some(error);
    }

    pub(crate) fn cancel(&mut self) {
        self.status = StepStatus::Cancelled;
        if self.started_at.is_some() {
            self.close();
        }
        self.log("step cancelled");
    }

    fn close(&mut self) {
        let now = Utc::now();
        self.finished_at = Some(now);
        if let Some(started) = self.started_at {
            self.duration_ms = Some((now - started).num_milliseconds().max(0) as u64);
        }
    }
}

/// One workflow execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub workflow_id: String,
    pub workflow_name: String,
    pub status: RunStatus,
    pub trigger: RunTrigger,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    pub steps: Vec<ExecutionStep>,
}

impl Run {
    /// Fresh record with every step `queued`, in node declaration order.
    pub(crate) fn new(graph: &WorkflowGraph, trigger: RunTrigger) -> Self {
        Self {
            id: ids::new_run_id(),
            workflow_id: graph.workflow_id().to_string(),
            workflow_name: graph.name().to_string(),
            status: RunStatus::Running,
            trigger,
            started_at: Utc::now(),
            finished_at: None,
            duration_ms: None,
            steps: graph.nodes().iter().map(ExecutionStep::queued).collect(),
        }
    }

    #[must_use]
    pub fn step(&self, node_id: &str) -> Option<&ExecutionStep> {
        self.steps.iter().find(|s| s.node_id == node_id)
    }

    pub(crate) fn step_mut(&mut self, node_id: &str) -> Option<&mut ExecutionStep> {
        self.steps.iter_mut().find(|s| s.node_id == node_id)
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// [`ExecutionStep::effective_status`] looked up by node id.
    #[must_use]
    pub fn effective_status_of(&self, node_id: &str) -> Option<StepStatus> {
        let terminal = self.is_terminal();
        self.step(node_id).map(|s| s.effective_status(terminal))
    }

    /// Node ids of steps that ended in `error`.
    #[must_use]
    pub fn failed_step_ids(&self) -> Vec<String> {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Error)
            .map(|s| s.node_id.clone())
            .collect()
    }

    pub(crate) fn finish(&mut self, status: RunStatus) {
        let now = Utc::now();
        self.status = status;
        self.finished_at = Some(now);
        self.duration_ms = Some((now - self.started_at).num_milliseconds().max(0) as u64);
    }
}
