//! Run Control: Pausing, Resuming, and Cancelling Workflows
//!
//! This demonstration drives long-running workflows through a [`RunHandle`]:
//! parking a run at a level boundary, releasing it again, cancelling a run
//! mid-flight, and reading everything back from the run registry.
//!
//! What You'll Learn:
//! 1. Detached Execution: Starting a run without awaiting it
//! 2. Pause and Resume: Parking a run between levels
//! 3. Cancellation: Stopping a run while keeping finished work
//! 4. The Registry: Reading live and historical run snapshots
//!
//! Running This Demo:
//! ```bash
//! cargo run --example run_control
//! ```

use async_trait::async_trait;
use miette::Result;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use stratoflow::graphs::{GraphNode, NodeRole, WorkflowGraph};
use stratoflow::runs::{RunStatus, RunTrigger, StepInput};
use stratoflow::scheduler::{Scheduler, SchedulerConfig, StepExecutor, StepExecutorError};
use tracing::info;

/// Executor that takes long enough per step for control calls to land.
struct SlowExecutor;

#[async_trait]
impl StepExecutor for SlowExecutor {
    async fn execute(&self, node_id: &str, _input: StepInput) -> Result<Value, StepExecutorError> {
        tokio::time::sleep(Duration::from_millis(150)).await;
        Ok(json!({"node": node_id}))
    }
}

fn report_pipeline() -> WorkflowGraph {
    WorkflowGraph::builder()
        .with_workflow_id("wf-report")
        .with_name("Nightly Report")
        .add_node(GraphNode::new("tick", "Nightly Tick", NodeRole::Trigger))
        .add_node(GraphNode::new("sales", "Load Sales", NodeRole::Action))
        .add_node(GraphNode::new("traffic", "Load Traffic", NodeRole::Action))
        .add_node(GraphNode::new("merge", "Merge Figures", NodeRole::Transform))
        .add_node(GraphNode::new("publish", "Publish Report", NodeRole::Output))
        .add_edge("tick", "sales")
        .add_edge("tick", "traffic")
        .add_edge("sales", "merge")
        .add_edge("traffic", "merge")
        .add_edge("merge", "publish")
        .build()
        .expect("static demo graph")
}

fn init_miette() {
    // Pretty panic reports
    miette::set_panic_hook();
}

#[tokio::main]
async fn main() -> Result<()> {
    stratoflow::telemetry::init();
    init_miette();
    demo().await
}

async fn demo() -> Result<()> {
    info!("\n╔══════════════════════════════════════════════════════════╗");
    info!("║                       Run Control                        ║");
    info!("║            Pause, Resume, and Cancel a Workflow          ║");
    info!("╚══════════════════════════════════════════════════════════╝\n");

    let scheduler = Scheduler::new(SchedulerConfig::default());
    let graph = report_pipeline();

    // ✅ STEP 1: Start a detached run and pause it
    info!("⏸  Step 1: Pausing a run at a level boundary");

    let handle = scheduler.start(
        graph.clone(),
        RunTrigger::schedule("0 2 * * *"),
        Arc::new(SlowExecutor),
    )?;
    let run_id = handle.run_id().to_owned();
    info!("   ✓ Run {} started in the background", run_id);

    tokio::time::sleep(Duration::from_millis(50)).await;
    info!("   ✓ Pause requested: {}", handle.pause());

    // The run parks once the in-flight level drains.
    loop {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if scheduler.registry().get(&run_id).map(|run| run.status) == Some(RunStatus::Paused) {
            break;
        }
    }
    let parked = scheduler
        .registry()
        .get(&run_id)
        .ok_or_else(|| miette::miette!("run vanished from the registry"))?;
    info!("   ✓ Run parked with status {:?}", parked.status);
    for step in &parked.steps {
        info!("      {}: {:?}", step.node_id, step.status);
    }

    // ✅ STEP 2: Resume and let it finish
    info!("\n▶️  Step 2: Resuming the parked run");

    info!("   ✓ Resume requested: {}", handle.resume());
    let run = handle.join().await?;
    info!("   ✓ Run finished: {:?} in {:?} ms", run.status, run.duration_ms);

    // ✅ STEP 3: Cancel a second run mid-flight
    info!("\n🛑 Step 3: Cancelling a run mid-flight");

    let handle = scheduler.start(
        graph.clone(),
        RunTrigger::manual_by("run_control"),
        Arc::new(SlowExecutor),
    )?;
    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.cancel();
    let cancelled = handle.join().await?;
    info!("   ✓ Run finished: {:?}", cancelled.status);
    for step in &cancelled.steps {
        info!(
            "      {}: recorded {:?}, effective {:?}",
            step.node_id,
            step.status,
            cancelled.effective_status_of(&step.node_id)
        );
    }

    // ✅ STEP 4: Read the history back from the registry
    info!("\n📚 Step 4: Reading run history from the registry");

    let history = scheduler.registry().history(graph.workflow_id());
    info!("   ✓ {} runs recorded for '{}':", history.len(), graph.workflow_id());
    for run in &history {
        info!("      {} -> {:?}", run.id, run.status);
    }

    // ✅ FINAL SUMMARY
    info!("\n╔══════════════════════════════════════════════════════════╗");
    info!("║                   Run Control Complete                   ║");
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("\n✅ Key patterns demonstrated:");
    info!("   • Detached runs with RunHandle");
    info!("   • Level-boundary pause and resume");
    info!("   • Cooperative cancellation that keeps finished work");
    info!("   • Registry snapshots and per-workflow history");

    Ok(())
}
