// tests/cancellation.rs

mod common;
use crate::common::builders::{TaskNodeBuilder, chain, task};
use crate::common::handlers::{CallLog, PendingHandler, ScriptedHandler};
use crate::common::{init_tracing, orchestrator_with, with_timeout};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use taskdag::engine::{Orchestrator, OrchestratorConfig, PlanStatus, RunOptions};
use taskdag::exec::ExecutionStatus;
use taskdag::plan::PlanConstraints;
use taskdag::types::{BackoffStrategy, TaskType};
use tokio_util::sync::CancellationToken;

#[tokio::test(start_paused = true)]
async fn cancelling_mid_batch_stops_the_run() {
    init_tracing();
    let handler = PendingHandler::new();
    let log = handler.log().clone();
    let orch = orchestrator_with(handler);
    orch.create_graph("g", chain(&["A", "B"], 10)).unwrap();
    let plan = orch.plan_execution("g", PlanConstraints::default()).unwrap();

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        });
    }

    let report = with_timeout(orch.execute_graph_with(
        "g",
        &plan,
        RunOptions::default().with_cancel(cancel),
    ))
    .await
    .unwrap();

    assert_eq!(report.status, PlanStatus::Cancelled);
    assert_eq!(report.result("A").unwrap().status, ExecutionStatus::Cancelled);
    assert!(report.result("B").is_none());
    assert!(!log.was_called("B"));
    assert_eq!(orch.history_len(), 1, "cancelled runs are still recorded");
}

#[tokio::test]
async fn pre_cancelled_token_runs_nothing() {
    let log = CallLog::new();
    let orch = orchestrator_with(ScriptedHandler::with_log(log.clone()));
    orch.create_graph("g", chain(&["A", "B"], 10)).unwrap();
    let plan = orch.plan_execution("g", PlanConstraints::default()).unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = orch
        .execute_graph_with("g", &plan, RunOptions::default().with_cancel(cancel))
        .await
        .unwrap();

    assert_eq!(report.status, PlanStatus::Cancelled);
    assert!(report.results.is_empty());
    assert_eq!(report.batches_run, 0);
    assert!(log.is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_backoff_sleep() {
    init_tracing();
    let log = CallLog::new();
    let orch = orchestrator_with(ScriptedHandler::with_log(log.clone()).always_fail("slow"));
    orch.create_graph(
        "g",
        vec![
            TaskNodeBuilder::analysis("slow")
                .retries(5, BackoffStrategy::Fixed, 60_000)
                .build(),
        ],
    )
    .unwrap();
    let plan = orch.plan_execution("g", PlanConstraints::default()).unwrap();

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel.cancel();
        });
    }

    let report = with_timeout(orch.execute_graph_with(
        "g",
        &plan,
        RunOptions::default().with_cancel(cancel),
    ))
    .await
    .unwrap();

    let result = report.result("slow").unwrap();
    assert_eq!(result.status, ExecutionStatus::Cancelled);
    assert_eq!(result.attempts, 1);
    assert_eq!(log.attempts_of("slow"), 1);
    assert!(result.duration < Duration::from_secs(60));
    assert_eq!(report.status, PlanStatus::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn cancellation_reaches_tasks_waiting_for_admission() {
    init_tracing();
    let handler = PendingHandler::new();
    let log = handler.log().clone();
    let orch = orchestrator_with(handler);
    orch.create_graph("g", vec![task("A", &[], 10), task("B", &[], 10)])
        .unwrap();
    let constraints = PlanConstraints {
        max_parallel_tasks: Some(1),
        ..PlanConstraints::default()
    };
    let plan = orch.plan_execution("g", constraints).unwrap();
    assert_eq!(plan.parallel_groups.len(), 1);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        });
    }

    let report = with_timeout(orch.execute_graph_with(
        "g",
        &plan,
        RunOptions::default().with_cancel(cancel),
    ))
    .await
    .unwrap();

    assert_eq!(report.status, PlanStatus::Cancelled);
    let mut attempts: Vec<u32> = report.results.values().map(|r| r.attempts).collect();
    attempts.sort();
    assert_eq!(attempts, vec![0, 1], "only one task got past admission");
    assert!(report.results.values().all(|r| r.status == ExecutionStatus::Cancelled));
    assert_eq!(log.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_run_stops_its_handlers() {
    init_tracing();
    let completed = Arc::new(AtomicUsize::new(0));
    let seen: Arc<Mutex<Option<CancellationToken>>> = Arc::new(Mutex::new(None));

    let orch = Orchestrator::new(OrchestratorConfig::default());
    {
        let completed = Arc::clone(&completed);
        let seen = Arc::clone(&seen);
        orch.register_fn(TaskType::ANALYSIS, move |_task, ctx| {
            let completed = Arc::clone(&completed);
            let seen = Arc::clone(&seen);
            async move {
                *seen.lock().unwrap() = Some(ctx.cancel.clone());
                tokio::time::sleep(Duration::from_millis(200)).await;
                completed.fetch_add(1, Ordering::SeqCst);
                Ok(json!(null))
            }
        });
    }
    orch.create_graph("g", vec![task("slow", &[], 200)]).unwrap();
    let plan = orch.plan_execution("g", PlanConstraints::default()).unwrap();

    let outcome = tokio::time::timeout(
        Duration::from_millis(20),
        orch.execute_graph("g", &plan, None),
    )
    .await;
    assert!(outcome.is_err(), "the run should still be in flight");

    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(completed.load(Ordering::SeqCst), 0);
    let token = seen.lock().unwrap().clone().expect("handler was invoked");
    assert!(token.is_cancelled());
    assert_eq!(orch.history_len(), 0);
}
