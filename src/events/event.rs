use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::runs::{Run, StepError};

/// Kind discriminant of an [`ExecutionEvent`].
///
/// Serialized names are the wire-level event names the editor UI listens
/// for (`execution_started`, `step_retrying`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ExecutionStarted,
    StepStarted,
    StepRetrying,
    StepCompleted,
    StepFailed,
    ExecutionCompleted,
    ExecutionFailed,
    Paused,
    Resumed,
    Cancelled,
}

impl EventKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ExecutionStarted => "execution_started",
            EventKind::StepStarted => "step_started",
            EventKind::StepRetrying => "step_retrying",
            EventKind::StepCompleted => "step_completed",
            EventKind::StepFailed => "step_failed",
            EventKind::ExecutionCompleted => "execution_completed",
            EventKind::ExecutionFailed => "execution_failed",
            EventKind::Paused => "paused",
            EventKind::Resumed => "resumed",
            EventKind::Cancelled => "cancelled",
        }
    }

    /// True for the three kinds that close a run's event sequence.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EventKind::ExecutionCompleted | EventKind::ExecutionFailed | EventKind::Cancelled
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observable transition of a run.
///
/// Events are emitted in transition order and carry everything an observer
/// needs without a registry read: the kind, the run id, a timestamp, the node
/// id for step-level kinds, and a kind-specific JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub kind: EventKind,
    pub run_id: String,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl ExecutionEvent {
    fn new(kind: EventKind, run_id: impl Into<String>) -> Self {
        Self {
            kind,
            run_id: run_id.into(),
            at: Utc::now(),
            node_id: None,
            payload: None,
        }
    }

    fn with_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn execution_started(run: &Run, levels: usize) -> Self {
        Self::new(EventKind::ExecutionStarted, &run.id).with_payload(json!({
            "workflow_id": run.workflow_id,
            "workflow_name": run.workflow_name,
            "trigger": run.trigger.kind(),
            "levels": levels,
            "steps": run.steps.len(),
        }))
    }

    /// Published when the step's first attempt actually begins, after it has
    /// claimed a parallelism slot. The step record itself flips to `running`
    /// earlier, at level dispatch.
    pub fn step_started(run_id: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self::new(EventKind::StepStarted, run_id).with_node(node_id)
    }

    pub fn step_retrying(
        run_id: impl Into<String>,
        node_id: impl Into<String>,
        attempt: u32,
        delay_ms: u64,
        error: &StepError,
    ) -> Self {
        Self::new(EventKind::StepRetrying, run_id)
            .with_node(node_id)
            .with_payload(json!({
                "attempt": attempt,
                "delay_ms": delay_ms,
                "error": error,
            }))
    }

    pub fn step_completed(
        run_id: impl Into<String>,
        node_id: impl Into<String>,
        output: &Value,
        duration_ms: Option<u64>,
        retry_count: u32,
    ) -> Self {
        Self::new(EventKind::StepCompleted, run_id)
            .with_node(node_id)
            .with_payload(json!({
                "output": output,
                "duration_ms": duration_ms,
                "retry_count": retry_count,
            }))
    }

    pub fn step_failed(
        run_id: impl Into<String>,
        node_id: impl Into<String>,
        error: &StepError,
        retry_count: u32,
    ) -> Self {
        Self::new(EventKind::StepFailed, run_id)
            .with_node(node_id)
            .with_payload(json!({
                "error": error,
                "retry_count": retry_count,
            }))
    }

    pub fn execution_completed(run: &Run) -> Self {
        Self::new(EventKind::ExecutionCompleted, &run.id).with_payload(json!({
            "duration_ms": run.duration_ms,
        }))
    }

    pub fn execution_failed(run: &Run) -> Self {
        Self::new(EventKind::ExecutionFailed, &run.id).with_payload(json!({
            "duration_ms": run.duration_ms,
            "failed_steps": run.failed_step_ids(),
        }))
    }

    pub fn paused(run_id: impl Into<String>) -> Self {
        Self::new(EventKind::Paused, run_id)
    }

    pub fn resumed(run_id: impl Into<String>) -> Self {
        Self::new(EventKind::Resumed, run_id)
    }

    pub fn cancelled(run_id: impl Into<String>) -> Self {
        Self::new(EventKind::Cancelled, run_id)
    }

    /// Structured JSON with a stable schema.
    ///
    /// ```json
    /// {
    ///   "kind": "step_completed",
    ///   "run_id": "…",
    ///   "at": "2025-11-03T12:34:56.789Z",
    ///   "node_id": "fetch",
    ///   "payload": { }
    /// }
    /// ```
    /// `node_id` and `payload` are present only when set.
    #[must_use]
    pub fn to_json_value(&self) -> Value {
        let mut object = serde_json::Map::new();
        object.insert("kind".into(), json!(self.kind.as_str()));
        object.insert("run_id".into(), json!(self.run_id));
        object.insert("at".into(), json!(self.at.to_rfc3339()));
        if let Some(node_id) = &self.node_id {
            object.insert("node_id".into(), json!(node_id));
        }
        if let Some(payload) = &self.payload {
            object.insert("payload".into(), payload.clone());
        }
        Value::Object(object)
    }

    /// Compact JSON string of [`Self::to_json_value`].
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_json_value())
    }
}

impl fmt::Display for ExecutionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node_id {
            Some(node_id) => write!(f, "[{}] {} ({node_id})", self.run_id, self.kind),
            None => write!(f, "[{}] {}", self.run_id, self.kind),
        }
    }
}
