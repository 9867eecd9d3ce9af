//! Cooperative control over an in-flight run.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::events::{EventHub, ExecutionEvent};
use crate::runs::Run;

use super::runner::ExecuteError;

/// The receiving half of a run's control surface, owned by the driver task.
pub(crate) struct RunControls {
    pub(crate) paused: watch::Receiver<bool>,
    pub(crate) cancel: CancellationToken,
}

impl RunControls {
    /// Creates a fresh pause flag and cancellation token. The returned sender
    /// is the caller's side of the pause flag; dropping it while the run is
    /// parked reads as an implicit resume.
    pub(crate) fn detached() -> (watch::Sender<bool>, Self) {
        let (pause_flag, paused) = watch::channel(false);
        let controls = Self {
            paused,
            cancel: CancellationToken::new(),
        };
        (pause_flag, controls)
    }
}

/// Handle to a run started with [`Scheduler::start`](super::Scheduler::start).
///
/// Pausing takes effect at the next level boundary: steps already dispatched
/// finish their current attempt, no new level starts until [`resume`] is
/// called. Cancelling is likewise cooperative and never aborts an attempt
/// mid-flight.
///
/// Dropping the handle detaches the run: it keeps executing to completion,
/// and a run parked at a pause point resumes on its own.
///
/// [`resume`]: RunHandle::resume
#[derive(Debug)]
pub struct RunHandle {
    run_id: String,
    pause_flag: watch::Sender<bool>,
    cancel: CancellationToken,
    hub: Arc<EventHub>,
    task: JoinHandle<Run>,
}

impl RunHandle {
    pub(crate) fn new(
        run_id: String,
        pause_flag: watch::Sender<bool>,
        cancel: CancellationToken,
        hub: Arc<EventHub>,
        task: JoinHandle<Run>,
    ) -> Self {
        Self {
            run_id,
            pause_flag,
            cancel,
            hub,
            task,
        }
    }

    /// Id of the run this handle controls.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Asks the run to park before its next level. Returns `true` if the
    /// flag flipped, `false` if the run was already pausing or has finished.
    pub fn pause(&self) -> bool {
        if self.task.is_finished() {
            return false;
        }
        let flipped = self.pause_flag.send_if_modified(|paused| {
            if *paused {
                false
            } else {
                *paused = true;
                true
            }
        });
        if flipped {
            self.hub.publish(ExecutionEvent::paused(&self.run_id));
            tracing::info!(run_id = %self.run_id, "pause requested");
        }
        flipped
    }

    /// Clears a pending pause. Returns `true` if the flag flipped.
    pub fn resume(&self) -> bool {
        if self.task.is_finished() {
            return false;
        }
        let flipped = self.pause_flag.send_if_modified(|paused| {
            if *paused {
                *paused = false;
                true
            } else {
                false
            }
        });
        if flipped {
            self.hub.publish(ExecutionEvent::resumed(&self.run_id));
            tracing::info!(run_id = %self.run_id, "resume requested");
        }
        flipped
    }

    /// Requests cancellation. The driver observes the token before each
    /// level and before each attempt, marks the run cancelled, and emits the
    /// terminal event itself. Idempotent.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            tracing::info!(run_id = %self.run_id, "cancellation requested");
        }
        self.cancel.cancel();
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether the driver task has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the run to reach a terminal status and returns its record.
    pub async fn join(self) -> Result<Run, ExecuteError> {
        Ok(self.task.await?)
    }
}
