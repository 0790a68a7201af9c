// tests/dag_validation.rs

mod common;
use crate::common::builders::{TaskNodeBuilder, diamond, task};
use crate::common::init_tracing;

use taskdag::engine::{Orchestrator, OrchestratorConfig};
use taskdag::errors::TaskdagError;

fn orchestrator() -> Orchestrator {
    Orchestrator::new(OrchestratorConfig::default())
}

#[test]
fn accepts_a_diamond_and_keeps_input_order() {
    init_tracing();
    let orch = orchestrator();

    orch.create_graph("g", diamond()).expect("diamond is a DAG");

    let graph = orch.graph("g").expect("graph stored");
    let ids: Vec<&str> = graph.task_ids().collect();
    assert_eq!(ids, vec!["A", "B", "C", "D"]);
    assert_eq!(graph.dependents_of("A"), ["B".to_string(), "C".to_string()]);
    assert_eq!(graph.roots().map(|t| t.id.as_str()).collect::<Vec<_>>(), vec!["A"]);
}

#[test]
fn rejects_self_dependency() {
    init_tracing();
    let orch = orchestrator();

    let err = orch
        .create_graph("g", vec![task("A", &["A"], 1)])
        .expect_err("self-loop must be rejected");

    match &err {
        TaskdagError::DagCycle { task, dependency, .. } => {
            assert_eq!(task, "A");
            assert_eq!(dependency, "A");
        }
        other => panic!("expected DagCycle, got {other:?}"),
    }
    assert!(err.is_graph_invalid());
    assert!(err.to_string().contains("Cycle detected in graph"));
    assert!(orch.graph("g").is_none());
}

#[test]
fn rejects_indirect_cycle_naming_the_closing_edge() {
    init_tracing();
    let orch = orchestrator();

    // A -> C -> B -> A along dependency edges.
    let tasks = vec![task("A", &["C"], 1), task("B", &["A"], 1), task("C", &["B"], 1)];
    let err = orch.create_graph("g", tasks).expect_err("cycle");

    match err {
        TaskdagError::DagCycle {
            graph_id,
            task,
            dependency,
        } => {
            assert_eq!(graph_id, "g");
            assert_eq!(task, "B");
            assert_eq!(dependency, "A");
        }
        other => panic!("expected DagCycle, got {other:?}"),
    }
}

#[test]
fn rejects_cycle_in_disjoint_component() {
    init_tracing();
    let orch = orchestrator();

    let mut tasks = diamond();
    tasks.push(task("X", &["Y"], 1));
    tasks.push(task("Y", &["X"], 1));

    let err = orch.create_graph("g", tasks).expect_err("cycle in second component");
    assert!(matches!(err, TaskdagError::DagCycle { .. }), "got {err:?}");
    assert!(orch.graph_ids().is_empty());
}

#[test]
fn cycle_detection_is_deterministic_for_fixed_input() {
    let tasks = vec![
        task("A", &["B"], 1),
        task("B", &["C"], 1),
        task("C", &["A"], 1),
        task("D", &["D"], 1),
    ];

    let first = taskdag::dag::validate_dag("g", &tasks).unwrap_err().to_string();
    for _ in 0..10 {
        let again = taskdag::dag::validate_dag("g", &tasks).unwrap_err().to_string();
        assert_eq!(first, again);
    }
}

#[test]
fn rejects_duplicate_task_ids() {
    init_tracing();
    let orch = orchestrator();

    let err = orch
        .create_graph("g", vec![task("A", &[], 1), task("A", &[], 2)])
        .expect_err("duplicate id");

    assert!(
        matches!(&err, TaskdagError::DuplicateTask { task, .. } if task == "A"),
        "got {err:?}"
    );
    assert!(err.is_graph_invalid());
}

#[test]
fn rejects_unknown_dependency() {
    init_tracing();
    let orch = orchestrator();

    let err = orch
        .create_graph("g", vec![task("A", &["ghost"], 1)])
        .expect_err("unknown dependency");

    assert!(
        matches!(
            &err,
            TaskdagError::UnknownDependency { task, dependency, .. }
                if task == "A" && dependency == "ghost"
        ),
        "got {err:?}"
    );
}

#[test]
fn rejects_empty_graph_id() {
    let orch = orchestrator();
    let err = orch.create_graph("  ", diamond()).expect_err("empty id");
    assert!(matches!(err, TaskdagError::InvalidGraph(_)));
}

#[test]
fn rejected_graph_does_not_replace_existing_one() {
    init_tracing();
    let orch = orchestrator();
    orch.create_graph("g", diamond()).unwrap();

    orch.create_graph("g", vec![task("A", &["A"], 1)])
        .expect_err("cycle");

    let graph = orch.graph("g").expect("original graph kept");
    assert_eq!(graph.len(), 4);
}

#[test]
fn recreating_a_graph_replaces_it() {
    let orch = orchestrator();
    orch.create_graph("g", diamond()).unwrap();
    orch.create_graph("g", vec![task("only", &[], 1)]).unwrap();

    let graph = orch.graph("g").unwrap();
    assert_eq!(graph.len(), 1);
    assert!(graph.contains("only"));
    assert_eq!(orch.graph_ids(), vec!["g".to_string()]);

    assert!(orch.remove_graph("g"));
    assert!(!orch.remove_graph("g"));
}

#[test]
fn repeated_dependency_entries_are_collapsed() {
    let orch = orchestrator();
    let tasks = vec![
        task("A", &[], 1),
        task("B", &[], 1),
        TaskNodeBuilder::analysis("C")
            .after("A")
            .after("B")
            .after("A")
            .build(),
    ];
    orch.create_graph("g", tasks).unwrap();

    let graph = orch.graph("g").unwrap();
    assert_eq!(graph.dependencies_of("C"), ["A".to_string(), "B".to_string()]);
    assert_eq!(graph.dependents_of("A"), ["C".to_string()]);
}
