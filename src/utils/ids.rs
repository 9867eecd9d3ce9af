//! Identifier generation for runs and workflows.
//!
//! Ids are plain strings so they survive serialization boundaries (the
//! editor UI, webhooks, registries) without a wrapper type. UUID v4 keeps
//! them unique across concurrently started runs with no coordination.

use uuid::Uuid;

/// Fresh unique id for a run.
#[must_use]
pub fn new_run_id() -> String {
    Uuid::new_v4().to_string()
}

/// Fresh unique id for a workflow built without an explicit one.
#[must_use]
pub fn new_workflow_id() -> String {
    Uuid::new_v4().to_string()
}
