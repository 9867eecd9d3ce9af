//! Quickstart: Building, Validating, and Running a Workflow
//!
//! This demonstration walks the full life of a workflow: describing it with
//! the fluent builder, checking it with the structural validator, planning its
//! execution levels, and running it with a custom step executor while
//! watching the event stream.
//!
//! What You'll Learn:
//! 1. Graph Building: Declaring nodes, roles, payloads, and connections
//! 2. Validation: Reading a [`ValidationReport`] before running anything
//! 3. Level Planning: How dependencies become parallel execution levels
//! 4. Execution: Implementing [`StepExecutor`] and driving a run
//! 5. Observation: Subscribing to the live event stream
//!
//! Running This Demo:
//! ```bash
//! cargo run --example quickstart
//! ```

use async_trait::async_trait;
use miette::Result;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use stratoflow::graphs::{GraphNode, NodeRole, WorkflowGraph};
use stratoflow::layering::Layering;
use stratoflow::runs::{RunTrigger, StepInput};
use stratoflow::scheduler::{Scheduler, SchedulerConfig, StepExecutor, StepExecutorError};
use stratoflow::validation::validate;
use tracing::info;

/// Executor for the welcome email workflow.
///
/// It keeps a copy of the graph so each step can look up its own payload by
/// node id; the scheduler itself never interprets payloads.
struct WelcomeEmailExecutor {
    graph: WorkflowGraph,
}

#[async_trait]
impl StepExecutor for WelcomeEmailExecutor {
    async fn execute(&self, node_id: &str, input: StepInput) -> Result<Value, StepExecutorError> {
        let node = self
            .graph
            .node(node_id)
            .ok_or_else(|| format!("unknown node '{node_id}'"))?;

        // Pretend each step does a little real work.
        tokio::time::sleep(Duration::from_millis(50)).await;

        Ok(json!({
            "node": node.id,
            "role": node.role,
            "payload": node.payload,
            "upstream": input.keys().collect::<Vec<_>>(),
        }))
    }
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
    info!("║                       Quickstart                         ║");
    info!("║         Build, Validate, Plan, and Run a Workflow        ║");
    info!("╚══════════════════════════════════════════════════════════╝\n");

    // ✅ STEP 1: Describe the workflow
    info!("🔗 Step 1: Building the welcome email workflow");

    let graph = WorkflowGraph::builder()
        .with_workflow_id("wf-welcome")
        .with_name("Welcome Email")
        .add_node(
            GraphNode::new("form", "Signup Form", NodeRole::Trigger)
                .with_payload(json!({"form_id": "signup"})),
        )
        .add_node(
            GraphNode::new("check", "Validate Address", NodeRole::Transform)
                .with_payload(json!({"field": "email"})),
        )
        .add_node(
            GraphNode::new("send", "Send Email", NodeRole::Action)
                .with_payload(json!({"template": "welcome"})),
        )
        .add_node(GraphNode::new("log", "Audit Log", NodeRole::Output))
        .add_edge("form", "check")
        .add_edge("check", "send")
        .add_edge("send", "log")
        .build()?;

    info!("   ✓ Graph built: {} nodes, {} edges", graph.nodes().len(), graph.edges().len());

    // ✅ STEP 2: Validate before running anything
    info!("\n🔍 Step 2: Validating the graph");

    let report = validate(&graph);
    info!(
        "   ✓ Valid: {} ({} errors, {} warnings)",
        report.is_valid(),
        report.errors().len(),
        report.warnings().len()
    );

    // A broken variant shows what the editor would display.
    let broken = WorkflowGraph::builder()
        .with_workflow_id("wf-broken")
        .add_node(GraphNode::new("a", "A", NodeRole::Action))
        .add_node(GraphNode::new("b", "B", NodeRole::Action))
        .add_edge("a", "b")
        .add_edge("b", "a")
        .build()?;
    let broken_report = validate(&broken);
    info!("   🧪 A cyclic graph, as the editor would see it:");
    for issue in broken_report.issues() {
        info!(
            "      [{:?}] {}: {}",
            issue.severity,
            issue.code.as_str(),
            issue.message
        );
    }

    // ✅ STEP 3: Plan the execution levels
    info!("\n🗺  Step 3: Planning execution levels");

    let layering = Layering::plan(&graph)?;
    for (index, level) in layering.levels().iter().enumerate() {
        info!("   ✓ Level {}: {:?}", index, level);
    }

    // ✅ STEP 4: Run it and watch the event stream
    info!("\n🚀 Step 4: Executing the workflow");

    let scheduler = Scheduler::new(SchedulerConfig::default());
    let mut events = scheduler.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let done = event.kind.is_terminal();
                    info!("   📡 {event}");
                    if done {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    let executor = Arc::new(WelcomeEmailExecutor {
        graph: graph.clone(),
    });
    let run = scheduler
        .execute(&graph, RunTrigger::manual_by("quickstart"), executor)
        .await?;
    let _ = printer.await;

    // ✅ STEP 5: Read the finished run
    info!("\n📊 Step 5: Inspecting the finished run");
    info!("   ✓ Run {} finished: {:?}", run.id, run.status);
    info!("   ✓ Duration: {:?} ms", run.duration_ms);
    for step in &run.steps {
        info!(
            "      {}: {:?} ({} log lines)",
            step.node_id,
            step.status,
            step.logs.len()
        );
    }

    // ✅ FINAL SUMMARY
    info!("\n╔══════════════════════════════════════════════════════════╗");
    info!("║                   Quickstart Complete                    ║");
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("\n✅ Key patterns demonstrated:");
    info!("   • Fluent graph construction with roles and payloads");
    info!("   • Structural validation with errors and warnings");
    info!("   • Kahn level planning for parallel execution");
    info!("   • Custom step executors and dependency inputs");
    info!("   • Live event stream subscription");
    info!("\n🎯 Next: Run run_control to see pause, resume, and cancel");

    Ok(())
}
