//! Pause, resume, and cancel behavior driven through [`RunHandle`].

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use stratoflow::events::EventKind;
use stratoflow::runs::{RunStatus, StepStatus};
use stratoflow::scheduler::{Scheduler, SchedulerConfig};

fn slow_scheduler() -> Scheduler {
    Scheduler::new(SchedulerConfig::default())
}

/// Waits until the registry shows `node_id` in the `Running` state for the
/// given run, so a follow-up pause or cancel lands while that level is in
/// flight.
async fn wait_until_step_running(scheduler: &Scheduler, run_id: &str, node_id: &str) {
    let registry = Arc::clone(scheduler.registry());
    let run_id = run_id.to_owned();
    let node_id = node_id.to_owned();
    wait_for("a step to reach Running", move || {
        registry
            .get(&run_id)
            .and_then(|run| run.step(&node_id).map(|step| step.status))
            == Some(StepStatus::Running)
    })
    .await;
}

#[tokio::test]
async fn pause_parks_the_run_between_levels() {
    let scheduler = slow_scheduler();
    let executor = Arc::new(SlowExecutor {
        delay: Duration::from_millis(40),
    });

    let handle = scheduler
        .start(welcome_email(), stratoflow::runs::RunTrigger::manual(), executor)
        .unwrap();
    let run_id = handle.run_id().to_owned();

    wait_until_step_running(&scheduler, &run_id, "form").await;
    assert!(handle.pause(), "first pause should flip the flag");

    let registry = Arc::clone(scheduler.registry());
    {
        let registry = Arc::clone(&registry);
        let run_id = run_id.clone();
        wait_for("the run to park", move || {
            registry.get(&run_id).map(|run| run.status) == Some(RunStatus::Paused)
        })
        .await;
    }

    // The in-flight level drained, but nothing downstream was dispatched.
    let parked = registry.get(&run_id).unwrap();
    assert_step_status(&parked, "form", StepStatus::Success);
    assert_step_status(&parked, "check", StepStatus::Queued);
    assert_step_status(&parked, "send", StepStatus::Queued);
    assert_step_status(&parked, "log", StepStatus::Queued);

    assert!(handle.resume(), "resume should flip the flag back");
    let run = handle.join().await.unwrap();
    assert_eq!(run.status, RunStatus::Success);
    for node in ["form", "check", "send", "log"] {
        assert_step_status(&run, node, StepStatus::Success);
    }
}

#[tokio::test]
async fn pause_and_resume_flags_are_idempotent() {
    let scheduler = slow_scheduler();
    let executor = Arc::new(SlowExecutor {
        delay: Duration::from_millis(40),
    });

    let handle = scheduler
        .start(welcome_email(), stratoflow::runs::RunTrigger::manual(), executor)
        .unwrap();

    assert!(handle.pause());
    assert!(!handle.pause(), "pausing a paused run is a no-op");
    assert!(handle.resume());
    assert!(!handle.resume(), "resuming a running run is a no-op");

    let run = handle.join().await.unwrap();
    assert_eq!(run.status, RunStatus::Success);
}

#[tokio::test]
async fn controls_are_refused_once_the_run_finished() {
    let scheduler = slow_scheduler();
    let handle = scheduler
        .start(chain(2), stratoflow::runs::RunTrigger::manual(), Arc::new(EchoExecutor))
        .unwrap();

    wait_for("the run to finish", || handle.is_finished()).await;
    assert!(!handle.pause());
    assert!(!handle.resume());

    let run = handle.join().await.unwrap();
    assert_eq!(run.status, RunStatus::Success);
}

#[tokio::test]
async fn cancel_mid_run_keeps_the_finished_steps() {
    let scheduler = slow_scheduler();
    let executor = Arc::new(SlowExecutor {
        delay: Duration::from_millis(40),
    });

    let handle = scheduler
        .start(welcome_email(), stratoflow::runs::RunTrigger::manual(), executor)
        .unwrap();
    let run_id = handle.run_id().to_owned();

    wait_until_step_running(&scheduler, &run_id, "form").await;
    handle.cancel();
    handle.cancel();
    assert!(handle.is_cancelled(), "cancellation is sticky");

    let run = handle.join().await.unwrap();
    assert_eq!(run.status, RunStatus::Cancelled);
    assert!(run.finished_at.is_some());
    assert!(run.duration_ms.is_some());

    // The attempt that was already in flight drains normally.
    assert_step_status(&run, "form", StepStatus::Success);
    // The tail of the workflow never ran and reads as skipped.
    assert_eq!(run.effective_status_of("log"), Some(StepStatus::Skipped));
}

#[tokio::test]
async fn cancel_during_retry_backoff_cancels_the_step() {
    let config = SchedulerConfig::default()
        .with_max_retries(5)
        .with_base_retry_delay(Duration::from_millis(300));
    let scheduler = Scheduler::new(config);
    let mut events = scheduler.subscribe();

    let handle = scheduler
        .start(
            chain(2),
            stratoflow::runs::RunTrigger::manual(),
            Arc::new(FailNodeExecutor { fail: "s0" }),
        )
        .unwrap();

    // Cancel once the first backoff window is open.
    loop {
        let event = events
            .next_timeout(Duration::from_secs(2))
            .await
            .expect("retry event before timeout");
        if event.kind == EventKind::StepRetrying {
            break;
        }
    }
    handle.cancel();

    let run = handle.join().await.unwrap();
    assert_eq!(run.status, RunStatus::Cancelled);

    let step = run.step("s0").unwrap();
    assert_eq!(step.status, StepStatus::Cancelled);
    assert_eq!(step.retry_count, 1);
    assert!(
        step.logs
            .iter()
            .any(|entry| entry.message.contains("cancelled during retry backoff")),
        "expected a backoff cancellation log, got {:?}",
        step.logs
    );
    assert_eq!(run.effective_status_of("s1"), Some(StepStatus::Skipped));
}

#[tokio::test]
async fn cancel_observed_in_the_final_level_settles_the_run_cancelled() {
    let config = SchedulerConfig::default()
        .with_max_retries(5)
        .with_base_retry_delay(Duration::from_millis(300));
    let scheduler = Scheduler::new(config);
    let mut events = scheduler.subscribe();

    // s1 sits in the last level, so no boundary check follows its cancel.
    let handle = scheduler
        .start(
            chain(2),
            stratoflow::runs::RunTrigger::manual(),
            Arc::new(FailNodeExecutor { fail: "s1" }),
        )
        .unwrap();

    loop {
        let event = events
            .next_timeout(Duration::from_secs(2))
            .await
            .expect("retry event before timeout");
        if event.kind == EventKind::StepRetrying {
            break;
        }
    }
    handle.cancel();

    let run = handle.join().await.unwrap();
    assert_eq!(run.status, RunStatus::Cancelled);
    assert_step_status(&run, "s0", StepStatus::Success);

    let step = run.step("s1").unwrap();
    assert_eq!(step.status, StepStatus::Cancelled);
    assert_eq!(step.retry_count, 1);
    assert!(step.output.is_none());

    // The run closes with `cancelled`, never `execution_completed`.
    let seen = drain(&mut events);
    assert_eq!(count_of(&seen, EventKind::Cancelled), 1);
    assert_eq!(count_of(&seen, EventKind::ExecutionCompleted), 0);
    assert_eq!(count_of(&seen, EventKind::ExecutionFailed), 0);
    assert_eq!(index_of(&seen, EventKind::Cancelled), seen.len() - 1);
}

#[tokio::test]
async fn dropping_the_handle_detaches_the_run() {
    let scheduler = slow_scheduler();
    let executor = Arc::new(SlowExecutor {
        delay: Duration::from_millis(30),
    });

    let handle = scheduler
        .start(welcome_email(), stratoflow::runs::RunTrigger::manual(), executor)
        .unwrap();
    let run_id = handle.run_id().to_owned();
    drop(handle);

    let registry = Arc::clone(scheduler.registry());
    {
        let registry = Arc::clone(&registry);
        let run_id = run_id.clone();
        wait_for("the detached run to finish", move || {
            registry.get(&run_id).is_some_and(|run| run.is_terminal())
        })
        .await;
    }

    let run = registry.get(&run_id).unwrap();
    assert_eq!(run.status, RunStatus::Success);
    for node in ["form", "check", "send", "log"] {
        assert_step_status(&run, node, StepStatus::Success);
    }
}

#[tokio::test]
async fn a_parked_run_resumes_when_its_handle_is_dropped() {
    let scheduler = slow_scheduler();
    let executor = Arc::new(SlowExecutor {
        delay: Duration::from_millis(40),
    });

    let handle = scheduler
        .start(welcome_email(), stratoflow::runs::RunTrigger::manual(), executor)
        .unwrap();
    let run_id = handle.run_id().to_owned();

    wait_until_step_running(&scheduler, &run_id, "form").await;
    assert!(handle.pause());

    let registry = Arc::clone(scheduler.registry());
    {
        let registry = Arc::clone(&registry);
        let run_id = run_id.clone();
        wait_for("the run to park", move || {
            registry.get(&run_id).map(|run| run.status) == Some(RunStatus::Paused)
        })
        .await;
    }

    // Dropping the handle drops the pause controller; the run lets itself out.
    drop(handle);
    {
        let registry = Arc::clone(&registry);
        let run_id = run_id.clone();
        wait_for("the abandoned run to finish", move || {
            registry.get(&run_id).is_some_and(|run| run.is_terminal())
        })
        .await;
    }

    let run = registry.get(&run_id).unwrap();
    assert_eq!(run.status, RunStatus::Success);
}

#[tokio::test]
async fn pause_and_resume_are_published_to_subscribers() {
    let scheduler = slow_scheduler();
    let mut events = scheduler.subscribe();
    let executor = Arc::new(SlowExecutor {
        delay: Duration::from_millis(30),
    });

    let handle = scheduler
        .start(welcome_email(), stratoflow::runs::RunTrigger::manual(), executor)
        .unwrap();
    let run_id = handle.run_id().to_owned();

    wait_until_step_running(&scheduler, &run_id, "form").await;
    assert!(handle.pause());
    {
        let registry = Arc::clone(scheduler.registry());
        let run_id = run_id.clone();
        wait_for("the run to park", move || {
            registry.get(&run_id).map(|run| run.status) == Some(RunStatus::Paused)
        })
        .await;
    }
    assert!(handle.resume());

    let run = handle.join().await.unwrap();
    assert_eq!(run.status, RunStatus::Success);

    let seen = drain(&mut events);
    assert_eq!(count_of(&seen, EventKind::Paused), 1);
    assert_eq!(count_of(&seen, EventKind::Resumed), 1);
    assert!(index_of(&seen, EventKind::Paused) < index_of(&seen, EventKind::Resumed));
    assert_eq!(
        index_of(&seen, EventKind::ExecutionCompleted),
        seen.len() - 1,
        "the terminal event closes the stream"
    );
}
