#![allow(dead_code)]

use stratoflow::graphs::{GraphNode, NodeRole, WorkflowGraph};

/// `start -> (fetch | enrich) -> merge`: two independent middle nodes whose
/// outputs both feed the terminal node.
pub fn diamond() -> WorkflowGraph {
    WorkflowGraph::builder()
        .with_workflow_id("wf-diamond")
        .with_name("Diamond")
        .add_node(GraphNode::new("start", "Start", NodeRole::Trigger))
        .add_node(GraphNode::new("fetch", "Fetch", NodeRole::Action))
        .add_node(GraphNode::new("enrich", "Enrich", NodeRole::Transform))
        .add_node(GraphNode::new("merge", "Merge", NodeRole::Output))
        .add_edge("start", "fetch")
        .add_edge("start", "enrich")
        .add_edge("fetch", "merge")
        .add_edge("enrich", "merge")
        .build()
        .unwrap()
}

/// Four sequential levels: `form -> check -> send -> log`.
pub fn welcome_email() -> WorkflowGraph {
    WorkflowGraph::builder()
        .with_workflow_id("wf-welcome")
        .with_name("Welcome email")
        .add_node(GraphNode::new("form", "Form submitted", NodeRole::Trigger))
        .add_node(GraphNode::new("check", "Validate input", NodeRole::Transform))
        .add_node(GraphNode::new("send", "Send email", NodeRole::Action))
        .add_node(GraphNode::new("log", "Log result", NodeRole::Output))
        .add_edge("form", "check")
        .add_edge("check", "send")
        .add_edge("send", "log")
        .build()
        .unwrap()
}

/// A trigger fanning out to `width` parallel actions, all feeding one output.
pub fn fan_out(width: usize) -> WorkflowGraph {
    let mut builder = WorkflowGraph::builder()
        .with_workflow_id("wf-fan")
        .with_name("Fan out")
        .add_node(GraphNode::new("start", "Start", NodeRole::Trigger))
        .add_node(GraphNode::new("sink", "Sink", NodeRole::Output));
    for i in 0..width {
        let id = format!("worker{i}");
        builder = builder
            .add_node(GraphNode::new(&id, format!("Worker {i}"), NodeRole::Action))
            .add_edge("start", &id)
            .add_edge(&id, "sink");
    }
    builder.build().unwrap()
}

/// A straight chain of `len` nodes (`len >= 2`): trigger, actions, output.
pub fn chain(len: usize) -> WorkflowGraph {
    assert!(len >= 2, "a chain needs at least a trigger and an output");
    let mut builder = WorkflowGraph::builder()
        .with_workflow_id("wf-chain")
        .with_name("Chain");
    for i in 0..len {
        let role = if i == 0 {
            NodeRole::Trigger
        } else if i == len - 1 {
            NodeRole::Output
        } else {
            NodeRole::Action
        };
        builder = builder.add_node(GraphNode::new(format!("s{i}"), format!("Step {i}"), role));
    }
    for i in 1..len {
        builder = builder.add_edge(format!("s{}", i - 1), format!("s{i}"));
    }
    builder.build().unwrap()
}

/// A single trigger node and nothing else.
pub fn solo() -> WorkflowGraph {
    WorkflowGraph::builder()
        .with_workflow_id("wf-solo")
        .with_name("Solo")
        .add_node(GraphNode::new("only", "Only", NodeRole::Trigger))
        .build()
        .unwrap()
}

/// A graph with no nodes at all.
pub fn empty() -> WorkflowGraph {
    WorkflowGraph::builder()
        .with_workflow_id("wf-empty")
        .with_name("Empty")
        .build()
        .unwrap()
}
