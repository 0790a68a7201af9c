// tests/planner.rs

mod common;
use crate::common::builders::{TaskNodeBuilder, chain, chain_with_side_branch, diamond, task};
use crate::common::init_tracing;

use std::time::Duration;

use taskdag::engine::{Orchestrator, OrchestratorConfig};
use taskdag::errors::TaskdagError;
use taskdag::plan::{PlanConstraints, partition_batches};
use taskdag::types::{ResourceLimits, TaskType};

fn orchestrator_with_graph(tasks: Vec<taskdag::dag::TaskNode>) -> Orchestrator {
    let orch = Orchestrator::new(OrchestratorConfig::default());
    orch.create_graph("g", tasks).expect("valid graph");
    orch
}

#[test]
fn diamond_batches_and_critical_path() {
    init_tracing();
    let orch = orchestrator_with_graph(diamond());

    let plan = orch
        .plan_execution("g", PlanConstraints::default())
        .expect("plan");

    assert_eq!(plan.graph_id, "g");
    assert_eq!(
        plan.batch_ids(),
        vec![
            vec!["A".to_string()],
            vec!["B".to_string(), "C".to_string()],
            vec!["D".to_string()],
        ]
    );
    assert_eq!(plan.critical_path, vec!["A", "B", "D"]);
    assert_eq!(plan.critical_path_duration, Duration::from_millis(35));
    // 10 + max(20, 5) + 5
    assert_eq!(plan.total_estimated_time, Duration::from_millis(35));
    assert!(plan.is_on_critical_path("B"));
    assert!(!plan.is_on_critical_path("C"));
}

#[test]
fn every_dependency_lands_in_an_earlier_batch() {
    let tasks = vec![
        task("e", &["c", "d"], 1),
        task("a", &[], 1),
        task("d", &["b"], 1),
        task("b", &["a"], 1),
        task("c", &["a"], 1),
    ];
    let batches = partition_batches("g", &tasks).unwrap();

    let ids: Vec<Vec<&str>> = batches
        .iter()
        .map(|b| b.iter().map(|t| t.id.as_str()).collect())
        .collect();
    assert_eq!(ids, vec![vec!["a"], vec!["b", "c"], vec!["d"], vec!["e"]]);
}

#[test]
fn independent_tasks_share_one_batch() {
    let tasks = vec![task("x", &[], 5), task("y", &[], 7), task("z", &[], 3)];
    let orch = orchestrator_with_graph(tasks);

    let plan = orch.plan_execution("g", PlanConstraints::default()).unwrap();

    assert_eq!(plan.parallel_groups.len(), 1);
    assert_eq!(plan.total_estimated_time, Duration::from_millis(7));
    assert_eq!(plan.critical_path, vec!["y"]);
}

#[test]
fn critical_path_follows_longest_branch_not_first_one() {
    let tasks = vec![
        task("root", &[], 1),
        task("short", &["root"], 1),
        task("long", &["root"], 100),
        task("join", &["short", "long"], 1),
    ];
    let orch = orchestrator_with_graph(tasks);

    let plan = orch.plan_execution("g", PlanConstraints::default()).unwrap();
    assert_eq!(plan.critical_path, vec!["root", "long", "join"]);
    assert_eq!(plan.critical_path_duration, Duration::from_millis(102));
}

#[test]
fn planning_is_repeatable() {
    init_tracing();
    let orch = orchestrator_with_graph(chain_with_side_branch());
    let constraints = PlanConstraints {
        max_parallel_tasks: Some(2),
        ..PlanConstraints::default()
    };

    let first = orch.plan_execution("g", constraints).unwrap();
    let second = orch.plan_execution("g", constraints).unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(first.parallel_groups, second.parallel_groups);
    assert_eq!(first.critical_path, second.critical_path);
    assert_eq!(first.optimizations, second.optimizations);
    assert_eq!(first.constraints, constraints);
}

#[test]
fn planning_does_not_touch_the_stored_graph() {
    let orch = orchestrator_with_graph(diamond());
    let before: Vec<_> = orch.graph("g").unwrap().tasks().cloned().collect();

    orch.plan_execution("g", PlanConstraints::default()).unwrap();

    let after: Vec<_> = orch.graph("g").unwrap().tasks().cloned().collect();
    assert_eq!(before, after);
}

#[test]
fn unknown_graph_is_reported() {
    let orch = Orchestrator::new(OrchestratorConfig::default());
    let err = orch
        .plan_execution("missing", PlanConstraints::default())
        .unwrap_err();
    assert!(matches!(err, TaskdagError::GraphNotFound(ref id) if id == "missing"));
}

#[test]
fn unplaceable_tasks_are_a_planner_deadlock() {
    // Bypasses graph validation on purpose: a cycle can only reach the
    // partitioner through a bug upstream.
    let tasks = vec![task("a", &[], 1), task("b", &["c"], 1), task("c", &["b"], 1)];

    let err = partition_batches("g", &tasks).unwrap_err();
    match err {
        TaskdagError::PlannerDeadlock { graph_id, unplaced } => {
            assert_eq!(graph_id, "g");
            assert_eq!(unplaced, vec!["b".to_string(), "c".to_string()]);
        }
        other => panic!("expected PlannerDeadlock, got {other:?}"),
    }
}

#[test]
fn resource_estimate_counts_gpu_tasks_for_peak_and_fraction_for_average() {
    let tasks = vec![
        TaskNodeBuilder::analysis("a").memory(100).cpu(1).gpu(true).build(),
        TaskNodeBuilder::analysis("b").memory(300).cpu(4).storage(50).build(),
        TaskNodeBuilder::analysis("c").memory(200).cpu(1).gpu(true).build(),
        TaskNodeBuilder::analysis("d").memory(0).cpu(2).build(),
    ];
    let orch = orchestrator_with_graph(tasks);

    let plan = orch.plan_execution("g", PlanConstraints::default()).unwrap();
    let req = plan.resource_requirements;

    assert_eq!(req.peak.memory, 300);
    assert_eq!(req.peak.cpu, 4);
    assert_eq!(req.peak.gpu, 2);
    assert_eq!(req.peak.storage, 50);

    assert!((req.average.memory - 150.0).abs() < f64::EPSILON);
    assert!((req.average.cpu - 2.0).abs() < f64::EPSILON);
    assert!((req.average.gpu - 0.5).abs() < f64::EPSILON);
    assert!((req.average.storage - 12.5).abs() < f64::EPSILON);
}

#[test]
fn advisory_notes_cover_ai_batches_checkpoints_and_gpus() {
    let tasks = vec![
        TaskNodeBuilder::new("ask1", TaskType::AI_REQUEST).duration_ms(10).build(),
        TaskNodeBuilder::new("ask2", TaskType::AI_REQUEST).duration_ms(10).build(),
        TaskNodeBuilder::new("train", TaskType::ANALYSIS)
            .after("ask1")
            .duration_ms(60_000)
            .gpu(true)
            .build(),
    ];
    let orch = orchestrator_with_graph(tasks);

    let plan = orch.plan_execution("g", PlanConstraints::default()).unwrap();
    let notes = plan.optimizations.join("\n");

    assert!(notes.contains("batch 0 has 2 ai_request tasks"), "{notes}");
    assert!(notes.contains("enable checkpointing"), "{notes}");
    assert!(notes.contains("train"), "{notes}");
    assert!(notes.contains("require a GPU"), "{notes}");
    assert!(!notes.contains("fully sequential"), "{notes}");
}

#[test]
fn advisory_notes_compare_against_constraints() {
    let tasks = vec![
        TaskNodeBuilder::analysis("a").duration_ms(500).memory(800).build(),
        TaskNodeBuilder::analysis("b").duration_ms(500).memory(100).build(),
        TaskNodeBuilder::analysis("c").duration_ms(500).memory(100).build(),
    ];
    let orch = orchestrator_with_graph(tasks);

    let constraints = PlanConstraints {
        max_parallel_tasks: Some(2),
        max_execution_time: Some(Duration::from_millis(100)),
        resource_limits: Some(ResourceLimits {
            memory: Some(512),
            ..ResourceLimits::default()
        }),
    };
    let plan = orch.plan_execution("g", constraints).unwrap();
    let notes = plan.optimizations.join("\n");

    assert!(notes.contains("max_parallel_tasks is 2"), "{notes}");
    assert!(notes.contains("exceeds max_execution_time"), "{notes}");
    assert!(notes.contains("peak memory demand 800 exceeds the limit of 512"), "{notes}");
    assert!(notes.contains("task a needs more memory"), "{notes}");

    // Advice never reshapes the plan.
    assert_eq!(plan.parallel_groups.len(), 1);
    assert_eq!(plan.parallel_groups[0].len(), 3);
}

#[test]
fn sequential_graph_is_noted() {
    let orch = orchestrator_with_graph(chain(&["a", "b", "c"], 10));
    let plan = orch.plan_execution("g", PlanConstraints::default()).unwrap();

    assert!(
        plan.optimizations
            .iter()
            .any(|n| n.contains("fully sequential")),
        "{:?}",
        plan.optimizations
    );
    assert_eq!(plan.critical_path, vec!["a", "b", "c"]);
}
