#![allow(dead_code)]

use stratoflow::events::{EventKind, EventStream, ExecutionEvent};
use stratoflow::runs::{Run, StepStatus};
use tokio::sync::broadcast::error::TryRecvError;

/// Drains everything currently buffered on the stream, skipping lag gaps.
pub fn drain(stream: &mut EventStream) -> Vec<ExecutionEvent> {
    let mut events = Vec::new();
    loop {
        match stream.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    events
}

pub fn kinds(events: &[ExecutionEvent]) -> Vec<EventKind> {
    events.iter().map(|e| e.kind).collect()
}

/// Index of the first event with this kind, regardless of node.
pub fn index_of(events: &[ExecutionEvent], kind: EventKind) -> usize {
    events
        .iter()
        .position(|e| e.kind == kind)
        .unwrap_or_else(|| panic!("no {kind} event in {:?}", kinds(events)))
}

/// Index of the first event with this kind for this node.
pub fn index_of_step(events: &[ExecutionEvent], kind: EventKind, node_id: &str) -> usize {
    events
        .iter()
        .position(|e| e.kind == kind && e.node_id.as_deref() == Some(node_id))
        .unwrap_or_else(|| panic!("no {kind} event for node '{node_id}'"))
}

pub fn count_of(events: &[ExecutionEvent], kind: EventKind) -> usize {
    events.iter().filter(|e| e.kind == kind).count()
}

/// Polls `condition` every few milliseconds, panicking if it stays false
/// for a full second.
pub async fn wait_for(what: &str, mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}

pub fn assert_step_status(run: &Run, node_id: &str, status: StepStatus) {
    let step = run
        .step(node_id)
        .unwrap_or_else(|| panic!("run has no step '{node_id}'"));
    assert_eq!(
        step.status, status,
        "step '{node_id}' has status {}, expected {status}",
        step.status
    );
}
