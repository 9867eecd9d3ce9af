//! Level-synchronized workflow execution.
//!
//! [`Scheduler`] turns a validated [`WorkflowGraph`] into a [`Run`] record.
//! It plans the graph into dependency levels, then walks the levels in order:
//! steps inside a level execute concurrently up to the configured
//! parallelism, and the next level starts only once every step of the
//! current one has settled. A step therefore always sees the recorded
//! outputs of all of its dependencies. Dispatch marks every step of a level
//! `running` at once; `step_started` fires when an attempt claims a
//! parallelism slot, and recorded step durations include that wait.
//!
//! Every attempt races the step timeout, and failing attempts are retried
//! with a linearly growing backoff. When a step exhausts its retries the
//! level still drains, the run is marked failed, and no further level starts.
//! Pause requests park the run at the next level boundary; cancellation is
//! checked before each level and before each attempt and never aborts an
//! attempt already in flight. A cancellation observed by any step settles
//! the run as `cancelled`, whether or not a later level boundary follows.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use stratoflow::graphs::{GraphNode, NodeRole, WorkflowGraph};
//! use stratoflow::runs::RunTrigger;
//! use stratoflow::scheduler::{Scheduler, SchedulerConfig, StepExecutor};
//!
//! # async fn demo(executor: Arc<dyn StepExecutor>) -> miette::Result<()> {
//! let graph = WorkflowGraph::builder()
//!     .with_workflow_id("wf-1")
//!     .with_name("Nightly sync")
//!     .add_node(GraphNode::new("start", "Start", NodeRole::Trigger))
//!     .add_node(GraphNode::new("fetch", "Fetch", NodeRole::Action))
//!     .add_node(GraphNode::new("store", "Store", NodeRole::Output))
//!     .add_edge("start", "fetch")
//!     .add_edge("fetch", "store")
//!     .build()?;
//!
//! let scheduler = Scheduler::new(SchedulerConfig::default());
//! let run = scheduler
//!     .execute(&graph, RunTrigger::manual(), executor)
//!     .await?;
//! println!("run {} finished as {}", run.id, run.status);
//! # Ok(())
//! # }
//! ```
//!
//! For a run you want to observe or steer while it executes, use
//! [`Scheduler::start`], which returns a [`RunHandle`] with pause, resume,
//! and cancel controls.

use std::sync::Arc;
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::events::{EventHub, EventStream, ExecutionEvent};
use crate::graphs::WorkflowGraph;
use crate::layering::{Layering, LayeringError};
use crate::registry::RunRegistry;
use crate::runs::{Run, RunStatus, RunTrigger, StepError, StepInput, StepLogEntry, StepStatus};
use crate::validation::{validate, ValidationReport};

use super::config::SchedulerConfig;
use super::contract::StepExecutor;
use super::control::{RunControls, RunHandle};

/// Errors from [`Scheduler::execute`] and [`Scheduler::start`].
#[derive(Debug, Error, Diagnostic)]
pub enum ExecuteError {
    /// The graph failed structural validation. The full report is attached;
    /// only `error`-severity issues block execution, warnings never do.
    #[error("workflow graph failed validation with {} error(s)", .report.errors().len())]
    #[diagnostic(
        code(stratoflow::scheduler::invalid_graph),
        help("inspect the attached report; warnings alone never block execution")
    )]
    InvalidGraph { report: ValidationReport },

    /// The layering pass found a cycle. Guards the direct planning path;
    /// graphs that went through validation are rejected as `InvalidGraph`
    /// before planning ever sees the cycle.
    #[error(transparent)]
    #[diagnostic(code(stratoflow::scheduler::cycle))]
    Cycle(#[from] LayeringError),

    /// The driver task of a detached run could not be joined.
    #[error(transparent)]
    #[diagnostic(code(stratoflow::scheduler::join))]
    Join(#[from] JoinError),
}

/// Executes workflow graphs level by level.
///
/// The scheduler owns the [`EventHub`] its runs publish to and the
/// [`RunRegistry`] they are recorded in; both are shared across every run it
/// starts. Cloning the scheduler clones those shared handles, not the state.
#[derive(Debug, Clone)]
pub struct Scheduler {
    config: SchedulerConfig,
    registry: Arc<RunRegistry>,
    hub: Arc<EventHub>,
}

impl Scheduler {
    /// Creates a scheduler with a fresh registry and event hub.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        let hub = EventHub::new(config.event_capacity);
        Self {
            config,
            registry: Arc::new(RunRegistry::new()),
            hub,
        }
    }

    /// Creates a scheduler recording runs into an existing registry.
    #[must_use]
    pub fn with_registry(config: SchedulerConfig, registry: Arc<RunRegistry>) -> Self {
        let hub = EventHub::new(config.event_capacity);
        Self {
            config,
            registry,
            hub,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<RunRegistry> {
        &self.registry
    }

    /// The hub every run started by this scheduler publishes to.
    #[must_use]
    pub fn events(&self) -> &Arc<EventHub> {
        &self.hub
    }

    /// Subscribes to the event hub. Only events published after this call
    /// are delivered.
    #[must_use]
    pub fn subscribe(&self) -> EventStream {
        self.hub.subscribe()
    }

    /// Runs the graph to completion and returns the finished [`Run`].
    ///
    /// Validation happens first: a report with blocking errors fails with
    /// [`ExecuteError::InvalidGraph`] and no run is created. An empty graph
    /// plans to zero levels and completes immediately as `success`.
    #[instrument(skip(self, graph, executor), fields(workflow_id = %graph.workflow_id()), err)]
    pub async fn execute(
        &self,
        graph: &WorkflowGraph,
        trigger: RunTrigger,
        executor: Arc<dyn StepExecutor>,
    ) -> Result<Run, ExecuteError> {
        let layering = self.preflight(graph)?;
        let run = Run::new(graph, trigger);
        // The pause flag has no external holder here; keeping the sender
        // alive pins the flag to `false` for the whole run.
        let (_pause_flag, controls) = RunControls::detached();
        Ok(drive(self.drive_context(executor, controls), run, layering).await)
    }

    /// Starts the run on a background task and returns a [`RunHandle`] for
    /// pausing, resuming, cancelling, and joining it.
    ///
    /// Validation and planning happen synchronously, so an invalid graph is
    /// rejected before anything is spawned or recorded.
    #[instrument(skip(self, graph, executor), fields(workflow_id = %graph.workflow_id()), err)]
    pub fn start(
        &self,
        graph: WorkflowGraph,
        trigger: RunTrigger,
        executor: Arc<dyn StepExecutor>,
    ) -> Result<RunHandle, ExecuteError> {
        let layering = self.preflight(&graph)?;
        let run = Run::new(&graph, trigger);
        let run_id = run.id.clone();
        let (pause_flag, controls) = RunControls::detached();
        let cancel = controls.cancel.clone();
        let task = tokio::spawn(drive(self.drive_context(executor, controls), run, layering));
        Ok(RunHandle::new(
            run_id,
            pause_flag,
            cancel,
            Arc::clone(&self.hub),
            task,
        ))
    }

    fn preflight(&self, graph: &WorkflowGraph) -> Result<Layering, ExecuteError> {
        let report = validate(graph);
        if !report.is_valid() {
            tracing::warn!(
                workflow_id = %graph.workflow_id(),
                errors = report.errors().len(),
                "refusing to execute an invalid graph"
            );
            return Err(ExecuteError::InvalidGraph { report });
        }
        Ok(Layering::plan(graph)?)
    }

    fn drive_context(&self, executor: Arc<dyn StepExecutor>, controls: RunControls) -> DriveContext {
        DriveContext {
            config: self.config.clone(),
            registry: Arc::clone(&self.registry),
            hub: Arc::clone(&self.hub),
            executor,
            controls,
        }
    }
}

// =============================================================================
// Driver
// =============================================================================

/// Everything the driver needs beyond the run itself.
struct DriveContext {
    config: SchedulerConfig,
    registry: Arc<RunRegistry>,
    hub: Arc<EventHub>,
    executor: Arc<dyn StepExecutor>,
    controls: RunControls,
}

enum PauseGate {
    Proceed,
    Cancelled,
}

/// Drives one run from `running` to a terminal status. Always returns the
/// finished record; step failures end up inside it, not as an `Err`.
#[instrument(skip_all, fields(run_id = %run.id, workflow_id = %run.workflow_id))]
async fn drive(ctx: DriveContext, mut run: Run, layering: Layering) -> Run {
    let DriveContext {
        config,
        registry,
        hub,
        executor,
        mut controls,
    } = ctx;
    let run_id = run.id.clone();
    let semaphore = Arc::new(Semaphore::new(config.parallelism));

    registry.upsert(run.clone());
    hub.publish(ExecutionEvent::execution_started(&run, layering.level_count()));
    tracing::info!(
        levels = layering.level_count(),
        steps = run.steps.len(),
        trigger = run.trigger.kind(),
        "workflow run started"
    );

    let mut failed = false;
    let mut cancelled = false;

    for (level_index, level) in layering.levels().iter().enumerate() {
        if let PauseGate::Cancelled = wait_if_paused(&mut run, &mut controls, &config, &registry).await {
            cancelled = true;
            break;
        }
        if controls.cancel.is_cancelled() {
            cancelled = true;
            break;
        }

        tracing::debug!(level = level_index, steps = level.len(), "dispatching level");

        let mut tasks: JoinSet<StepOutcome> = JoinSet::new();
        for node_id in level {
            let input = gather_input(&run, &layering, node_id);
            if let Some(step) = run.step_mut(node_id) {
                step.begin(input.clone());
            }
            tasks.spawn(run_step_attempts(AttemptContext {
                run_id: run_id.clone(),
                node_id: node_id.clone(),
                input,
                executor: Arc::clone(&executor),
                hub: Arc::clone(&hub),
                cancel: controls.cancel.clone(),
                semaphore: Arc::clone(&semaphore),
                max_retries: config.max_retries,
                base_delay: config.base_retry_delay,
                step_timeout: config.step_timeout,
            }));
        }
        registry.upsert(run.clone());

        let mut level_failed = false;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    // A cancel observed mid-level may land in the last level,
                    // past every boundary check.
                    if matches!(outcome.verdict, StepVerdict::Cancelled) {
                        cancelled = true;
                    }
                    if apply_outcome(&mut run, &run_id, &hub, outcome) {
                        level_failed = true;
                    }
                    registry.upsert(run.clone());
                }
                Err(join_error) => {
                    tracing::error!(error = %join_error, "step task failed to join");
                    level_failed = true;
                }
            }
        }
        // A step still `running` here lost its task without reporting back.
        for node_id in level {
            let Some(step) = run.step_mut(node_id) else {
                continue;
            };
            if step.status != StepStatus::Running {
                continue;
            }
            let error =
                StepError::execution("step task ended without reporting a result").into_terminal();
            let retry_count = step.retry_count;
            hub.publish(ExecutionEvent::step_failed(&run_id, node_id, &error, retry_count));
            step.fail(error);
            level_failed = true;
        }
        if level_failed {
            registry.upsert(run.clone());
            failed = true;
            break;
        }
    }

    let status = if failed {
        RunStatus::Error
    } else if cancelled {
        RunStatus::Cancelled
    } else {
        RunStatus::Success
    };
    run.finish(status);
    registry.upsert(run.clone());
    match status {
        RunStatus::Error => {
            hub.publish(ExecutionEvent::execution_failed(&run));
            tracing::warn!(
                duration_ms = run.duration_ms,
                failed_steps = ?run.failed_step_ids(),
                "workflow run failed"
            );
        }
        RunStatus::Cancelled => {
            hub.publish(ExecutionEvent::cancelled(&run_id));
            tracing::info!(duration_ms = run.duration_ms, "workflow run cancelled");
        }
        _ => {
            hub.publish(ExecutionEvent::execution_completed(&run));
            tracing::info!(duration_ms = run.duration_ms, "workflow run completed");
        }
    }
    run
}

/// Parks the run while the pause flag is set. Marks the record `paused` on
/// first park and `running` again on release. A dropped pause controller
/// reads as an implicit resume.
async fn wait_if_paused(
    run: &mut Run,
    controls: &mut RunControls,
    config: &SchedulerConfig,
    registry: &RunRegistry,
) -> PauseGate {
    let mut parked = false;
    loop {
        if !*controls.paused.borrow_and_update() {
            break;
        }
        if !parked {
            parked = true;
            run.status = RunStatus::Paused;
            registry.upsert(run.clone());
            tracing::info!(run_id = %run.id, "run parked at level boundary");
        }
        tokio::select! {
            _ = controls.cancel.cancelled() => return PauseGate::Cancelled,
            changed = controls.paused.changed() => {
                if changed.is_err() {
                    tracing::warn!(run_id = %run.id, "pause controller dropped while parked, resuming");
                    break;
                }
            }
            _ = tokio::time::sleep(config.pause_poll_interval) => {}
        }
    }
    if parked {
        run.status = RunStatus::Running;
        registry.upsert(run.clone());
        tracing::info!(run_id = %run.id, "run released from pause");
    }
    PauseGate::Proceed
}

/// Collects the recorded outputs of every dependency of `node_id`, keyed by
/// dependency id. Dependencies without an output contribute nothing.
fn gather_input(run: &Run, layering: &Layering, node_id: &str) -> StepInput {
    let mut input = StepInput::default();
    if let Some(entry) = layering.entry(node_id) {
        for dependency in &entry.dependencies {
            if let Some(output) = run.step(dependency).and_then(|s| s.output.clone()) {
                input.insert(dependency.clone(), output);
            }
        }
    }
    input
}

/// Folds a settled attempt loop back into the run record and publishes the
/// matching step event. Returns true when the step failed terminally.
fn apply_outcome(run: &mut Run, run_id: &str, hub: &EventHub, outcome: StepOutcome) -> bool {
    let StepOutcome {
        node_id,
        verdict,
        retries_used,
        logs,
    } = outcome;
    let Some(step) = run.step_mut(&node_id) else {
        tracing::warn!(node_id = %node_id, "outcome for an unknown step, dropping");
        return false;
    };
    step.retry_count = retries_used;
    step.logs.extend(logs);
    match verdict {
        StepVerdict::Success { output } => {
            step.succeed(output.clone());
            let duration_ms = step.duration_ms;
            hub.publish(ExecutionEvent::step_completed(
                run_id,
                &node_id,
                &output,
                duration_ms,
                retries_used,
            ));
            false
        }
        StepVerdict::Failed { error } => {
            hub.publish(ExecutionEvent::step_failed(run_id, &node_id, &error, retries_used));
            step.fail(error);
            true
        }
        StepVerdict::Cancelled => {
            step.cancel();
            false
        }
    }
}

// =============================================================================
// Attempt loop
// =============================================================================

/// Owned context for one step's attempt loop, moved onto its task.
struct AttemptContext {
    run_id: String,
    node_id: String,
    input: StepInput,
    executor: Arc<dyn StepExecutor>,
    hub: Arc<EventHub>,
    cancel: CancellationToken,
    semaphore: Arc<Semaphore>,
    max_retries: u32,
    base_delay: Duration,
    step_timeout: Duration,
}

struct StepOutcome {
    node_id: String,
    verdict: StepVerdict,
    retries_used: u32,
    logs: Vec<StepLogEntry>,
}

enum StepVerdict {
    Success { output: serde_json::Value },
    Failed { error: StepError },
    Cancelled,
}

/// Runs one step until success, exhaustion, or cancellation.
///
/// Holds one parallelism permit for the whole loop, so retries of an
/// in-flight step never free a slot for the rest of the level. Attempt `n`
/// that fails with retries remaining is retried as attempt `n + 1` after
/// `base_delay * n`; cancellation is observed before each attempt and during
/// backoff, never while the executor future is in flight.
async fn run_step_attempts(ctx: AttemptContext) -> StepOutcome {
    let mut logs: Vec<StepLogEntry> = Vec::new();
    let mut retries_used = 0u32;
    let Ok(_permit) = Arc::clone(&ctx.semaphore).acquire_owned().await else {
        // The semaphore only closes when the driver is torn down.
        return StepOutcome {
            node_id: ctx.node_id,
            verdict: StepVerdict::Cancelled,
            retries_used,
            logs,
        };
    };

    let mut attempt: u32 = 1;
    loop {
        if ctx.cancel.is_cancelled() {
            logs.push(StepLogEntry::new("cancelled before attempt"));
            return StepOutcome {
                node_id: ctx.node_id,
                verdict: StepVerdict::Cancelled,
                retries_used,
                logs,
            };
        }
        if attempt == 1 {
            ctx.hub
                .publish(ExecutionEvent::step_started(&ctx.run_id, &ctx.node_id));
        }

        let started = Instant::now();
        let failure = match timeout(
            ctx.step_timeout,
            ctx.executor.execute(&ctx.node_id, ctx.input.clone()),
        )
        .await
        {
            Ok(Ok(output)) => {
                return StepOutcome {
                    node_id: ctx.node_id,
                    verdict: StepVerdict::Success { output },
                    retries_used,
                    logs,
                };
            }
            Ok(Err(error)) => StepError::execution(error.to_string()),
            Err(_) => StepError::timeout(started.elapsed().as_millis() as u64),
        };

        if attempt > ctx.max_retries {
            tracing::debug!(
                node_id = %ctx.node_id,
                attempts = attempt,
                "step exhausted its retries"
            );
            return StepOutcome {
                node_id: ctx.node_id,
                verdict: StepVerdict::Failed {
                    error: failure.into_terminal(),
                },
                retries_used,
                logs,
            };
        }

        let delay = ctx.base_delay * attempt;
        retries_used = attempt;
        logs.push(StepLogEntry::new(format!(
            "attempt {attempt} failed ({}): {}; retrying in {} ms",
            failure.code.as_str(),
            failure.message,
            delay.as_millis()
        )));
        ctx.hub.publish(ExecutionEvent::step_retrying(
            &ctx.run_id,
            &ctx.node_id,
            attempt,
            delay.as_millis() as u64,
            &failure,
        ));
        tokio::select! {
            _ = ctx.cancel.cancelled() => {
                logs.push(StepLogEntry::new("cancelled during retry backoff"));
                return StepOutcome {
                    node_id: ctx.node_id,
                    verdict: StepVerdict::Cancelled,
                    retries_used,
                    logs,
                };
            }
            _ = tokio::time::sleep(delay) => {}
        }
        attempt += 1;
    }
}
