//! In-memory store of run records.
//!
//! The registry is the one structure shared between a scheduler and its
//! observers. Writers insert whole-run snapshots; readers get clones, so a
//! reader can never watch a run mutate under it. Nothing is persisted: a
//! process restart forgets every run, and the registry makes no attempt to
//! cap its own growth beyond [`clear`](RunRegistry::clear).

use std::sync::RwLock;

use rustc_hash::FxHashMap;

use crate::runs::Run;

/// Conventional page size for history queries, matching what the editor UI
/// shows per workflow.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Concurrent map of run id to the latest snapshot of that run.
#[derive(Debug, Default)]
pub struct RunRegistry {
    inner: RwLock<FxHashMap<String, Run>>,
}

impl RunRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the snapshot stored under `run.id`.
    pub fn upsert(&self, run: Run) {
        let mut inner = self.inner.write().expect("run registry lock poisoned");
        inner.insert(run.id.clone(), run);
    }

    /// Snapshot of one run.
    #[must_use]
    pub fn get(&self, run_id: &str) -> Option<Run> {
        let inner = self.inner.read().expect("run registry lock poisoned");
        inner.get(run_id).cloned()
    }

    /// Every run of `workflow_id`, newest first by start time.
    #[must_use]
    pub fn history(&self, workflow_id: &str) -> Vec<Run> {
        let inner = self.inner.read().expect("run registry lock poisoned");
        let mut runs: Vec<Run> = inner
            .values()
            .filter(|run| run.workflow_id == workflow_id)
            .cloned()
            .collect();
        sort_newest_first(&mut runs);
        runs
    }

    /// Like [`Self::history`] but capped at `limit` entries
    /// ([`DEFAULT_HISTORY_LIMIT`] is the conventional cap).
    #[must_use]
    pub fn recent(&self, workflow_id: &str, limit: usize) -> Vec<Run> {
        let mut runs = self.history(workflow_id);
        runs.truncate(limit);
        runs
    }

    /// Every stored run across all workflows, newest first.
    #[must_use]
    pub fn runs(&self) -> Vec<Run> {
        let inner = self.inner.read().expect("run registry lock poisoned");
        let mut runs: Vec<Run> = inner.values().cloned().collect();
        sort_newest_first(&mut runs);
        runs
    }

    /// Drops every stored run.
    pub fn clear(&self) {
        let mut inner = self.inner.write().expect("run registry lock poisoned");
        let cleared = inner.len();
        inner.clear();
        tracing::debug!(cleared, "run registry cleared");
    }

    #[must_use]
    pub fn len(&self) -> usize {
        let inner = self.inner.read().expect("run registry lock poisoned");
        inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn sort_newest_first(runs: &mut [Run]) {
    runs.sort_by(|a, b| {
        b.started_at
            .cmp(&a.started_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
