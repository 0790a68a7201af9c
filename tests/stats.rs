// tests/stats.rs

mod common;
use crate::common::builders::{chain, task};
use crate::common::handlers::ScriptedHandler;
use crate::common::{init_tracing, orchestrator_with};

use std::time::Duration;

use taskdag::engine::{StatsReport, default_group_key};
use taskdag::plan::PlanConstraints;

#[test]
fn unknown_graph_has_no_history() {
    let orch = orchestrator_with(ScriptedHandler::new());

    let stats = orch.get_stats(Some("unknown-graph"));

    assert!(stats.is_no_history());
    assert_eq!(
        stats,
        StatsReport::NoHistory {
            message: "no history".to_string()
        }
    );
    assert!(orch.get_stats(None).is_no_history());
}

#[tokio::test]
async fn zero_success_rate_is_not_no_history() {
    init_tracing();
    let orch = orchestrator_with(ScriptedHandler::new().always_fail("only"));
    orch.create_graph("g", vec![task("only", &[], 1)]).unwrap();
    let plan = orch.plan_execution("g", PlanConstraints::default()).unwrap();
    orch.execute_graph("g", &plan, None).await.unwrap();

    let stats = orch.get_stats(Some("g"));
    let summary = stats.summary().expect("history exists");

    assert_eq!(summary.total_executions, 1);
    assert_eq!(summary.successes, 0);
    assert_eq!(summary.failures, 1);
    assert_eq!(summary.success_rate, 0.0);
}

#[tokio::test]
async fn stats_are_scoped_per_graph_and_grouped_by_prefix() {
    let orch = orchestrator_with(ScriptedHandler::new().always_fail("fetch_b"));
    orch.create_graph(
        "etl",
        vec![
            task("fetch_a", &[], 1),
            task("fetch_b", &[], 1),
            task("clean-a", &["fetch_a"], 1),
        ],
    )
    .unwrap();
    orch.create_graph("other", chain(&["x", "y"], 1)).unwrap();

    let etl = orch.plan_execution("etl", PlanConstraints::default()).unwrap();
    let other = orch.plan_execution("other", PlanConstraints::default()).unwrap();
    orch.execute_graph("etl", &etl, None).await.unwrap();
    orch.execute_graph("other", &other, None).await.unwrap();

    let stats = orch.get_stats(Some("etl"));
    let summary = stats.summary().unwrap();
    assert_eq!(summary.total_executions, 3);
    assert_eq!(summary.successes, 2);
    assert!((summary.success_rate - 2.0 / 3.0).abs() < 1e-9);

    let fetch = &summary.by_group["fetch"];
    assert_eq!(fetch.count, 2);
    assert_eq!(fetch.successes, 1);
    assert_eq!(fetch.success_rate, 0.5);
    assert_eq!(summary.by_group["clean"].count, 1);

    let all = orch.get_stats(None);
    assert_eq!(all.summary().unwrap().total_executions, 5);
    assert!(orch.get_stats(Some("missing")).is_no_history());
}

#[tokio::test]
async fn custom_grouping_key() {
    let orch = orchestrator_with(ScriptedHandler::new());
    orch.create_graph("g", chain(&["a1", "b22", "c333"], 1)).unwrap();
    let plan = orch.plan_execution("g", PlanConstraints::default()).unwrap();
    orch.execute_graph("g", &plan, None).await.unwrap();

    let stats = orch.get_stats_by(Some("g"), |id| format!("len{}", id.len()));
    let groups: Vec<&String> = stats.summary().unwrap().by_group.keys().collect();
    assert_eq!(groups, vec!["len2", "len3", "len4"]);
}

#[test]
fn default_group_key_splits_on_common_separators() {
    assert_eq!(default_group_key("ai_request_3"), "ai");
    assert_eq!(default_group_key("fetch-users"), "fetch");
    assert_eq!(default_group_key("llm.summarise"), "llm");
    assert_eq!(default_group_key("step:2"), "step");
    assert_eq!(default_group_key("plain"), "plain");
    assert_eq!(default_group_key("_leading"), "_leading");
}

#[tokio::test(start_paused = true)]
async fn average_duration_is_the_mean_of_recorded_runs() {
    let orch = orchestrator_with(
        ScriptedHandler::new()
            .delay("fast", Duration::from_millis(100))
            .delay("slow", Duration::from_millis(300)),
    );
    orch.create_graph("g", vec![task("fast", &[], 100), task("slow", &[], 300)])
        .unwrap();
    let plan = orch.plan_execution("g", PlanConstraints::default()).unwrap();
    orch.execute_graph("g", &plan, None).await.unwrap();

    let stats = orch.get_stats(Some("g"));
    let summary = stats.summary().expect("history exists");
    let average = summary.average_duration;

    assert!(
        average >= Duration::from_millis(199) && average <= Duration::from_millis(201),
        "got {average:?}"
    );
    assert_eq!(summary.by_group.len(), 2);
}
