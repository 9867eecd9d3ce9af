mod common;

use common::graphs;
use stratoflow::graphs::{GraphNode, NodeRole, WorkflowGraph};
use stratoflow::layering::{Layering, LayeringError};

#[test]
fn diamond_plans_to_three_levels() {
    let layering = Layering::plan(&graphs::diamond()).unwrap();
    assert_eq!(
        layering.levels(),
        &[
            vec!["start".to_string()],
            vec!["enrich".to_string(), "fetch".to_string()],
            vec!["merge".to_string()],
        ]
    );
    assert_eq!(layering.level_count(), 3);
    assert_eq!(layering.len(), 4);
}

#[test]
fn nodes_within_a_level_are_sorted_by_id() {
    let graph = WorkflowGraph::builder()
        .add_node(GraphNode::new("zeta", "Z", NodeRole::Action))
        .add_node(GraphNode::new("alpha", "A", NodeRole::Action))
        .add_node(GraphNode::new("mid", "M", NodeRole::Action))
        .build()
        .unwrap();
    let layering = Layering::plan(&graph).unwrap();
    assert_eq!(
        layering.levels(),
        &[vec![
            "alpha".to_string(),
            "mid".to_string(),
            "zeta".to_string()
        ]]
    );
}

#[test]
fn entries_expose_dependencies_and_dependents() {
    let layering = Layering::plan(&graphs::diamond()).unwrap();

    let merge = layering.entry("merge").unwrap();
    assert_eq!(merge.level, 2);
    assert_eq!(
        merge.dependencies,
        vec!["enrich".to_string(), "fetch".to_string()]
    );
    assert!(merge.dependents.is_empty());

    let start = layering.entry("start").unwrap();
    assert!(start.dependencies.is_empty());
    assert_eq!(
        start.dependents,
        vec!["enrich".to_string(), "fetch".to_string()]
    );

    assert_eq!(layering.level_of("fetch"), Some(1));
    assert_eq!(layering.level_of("ghost"), None);
}

#[test]
fn unknown_edge_endpoints_are_ignored() {
    let graph = WorkflowGraph::builder()
        .add_node(GraphNode::new("in", "In", NodeRole::Trigger))
        .add_node(GraphNode::new("out", "Out", NodeRole::Output))
        .add_edge("in", "out")
        .add_edge("in", "ghost")
        .add_edge("phantom", "out")
        .build()
        .unwrap();
    let layering = Layering::plan(&graph).unwrap();
    assert_eq!(
        layering.levels(),
        &[vec!["in".to_string()], vec!["out".to_string()]]
    );
    // The phantom edge contributes nothing to the dependency lists.
    assert_eq!(
        layering.entry("out").unwrap().dependencies,
        vec!["in".to_string()]
    );
}

#[test]
fn duplicate_edges_count_once() {
    let graph = WorkflowGraph::builder()
        .add_node(GraphNode::new("a", "A", NodeRole::Trigger))
        .add_node(GraphNode::new("b", "B", NodeRole::Output))
        .add_edge("a", "b")
        .add_edge("a", "b")
        .add_edge("a", "b")
        .build()
        .unwrap();
    let layering = Layering::plan(&graph).unwrap();
    assert_eq!(layering.level_of("b"), Some(1));
    assert_eq!(layering.entry("b").unwrap().dependencies, vec!["a".to_string()]);
}

#[test]
fn cycle_residue_names_exactly_the_stuck_nodes() {
    let graph = WorkflowGraph::builder()
        .add_node(GraphNode::new("a", "A", NodeRole::Action))
        .add_node(GraphNode::new("b", "B", NodeRole::Action))
        .add_node(GraphNode::new("c", "C", NodeRole::Action))
        .add_node(GraphNode::new("free", "Free", NodeRole::Action))
        .add_edge("a", "b")
        .add_edge("b", "c")
        .add_edge("c", "a")
        .build()
        .unwrap();
    let err = Layering::plan(&graph).unwrap_err();
    let LayeringError::CycleResidue { unplaced } = err;
    assert_eq!(
        unplaced,
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    );
}

#[test]
fn downstream_of_a_cycle_is_residue_too() {
    // `sink` itself is acyclic but can never become ready.
    let graph = WorkflowGraph::builder()
        .add_node(GraphNode::new("a", "A", NodeRole::Action))
        .add_node(GraphNode::new("b", "B", NodeRole::Action))
        .add_node(GraphNode::new("sink", "Sink", NodeRole::Output))
        .add_edge("a", "b")
        .add_edge("b", "a")
        .add_edge("b", "sink")
        .build()
        .unwrap();
    let err = Layering::plan(&graph).unwrap_err();
    let LayeringError::CycleResidue { unplaced } = err;
    assert_eq!(
        unplaced,
        vec!["a".to_string(), "b".to_string(), "sink".to_string()]
    );
}

#[test]
fn long_chain_keeps_one_node_per_level() {
    let layering = Layering::plan(&graphs::chain(12)).unwrap();
    assert_eq!(layering.level_count(), 12);
    for (index, level) in layering.levels().iter().enumerate() {
        assert_eq!(level, &vec![format!("s{index}")]);
    }
}
