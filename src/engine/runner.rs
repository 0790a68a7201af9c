// src/engine/runner.rs

//! Batch-by-batch plan execution.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::dag::TaskId;
use crate::engine::{EventSink, ExecutionEvent, PlanStatus, TaskState};
use crate::exec::{
    BoundTask, ExecutionResult, ResourceBudget, TaskContext, TaskHandler, run_batch,
};
use crate::plan::ExecutionPlan;
use crate::types::DependencyFailurePolicy;

/// Per-call options for a graph execution.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Caller context passed to every handler.
    pub context: serde_json::Value,
    /// Cancelling this token stops the run cooperatively.
    pub cancel: CancellationToken,
    /// Events are sent with backpressure: a bounded receiver that is never
    /// drained stalls the run once its buffer fills.
    pub events: Option<mpsc::Sender<ExecutionEvent>>,
    /// Overrides the orchestrator's default policy when set.
    pub dependency_policy: Option<DependencyFailurePolicy>,
}

impl RunOptions {
    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Stream events to `tx`. Keep the receiver drained or dropped; a full
    /// channel blocks the run until there is room.
    pub fn with_events(mut self, tx: mpsc::Sender<ExecutionEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn with_dependency_policy(mut self, policy: DependencyFailurePolicy) -> Self {
        self.dependency_policy = Some(policy);
        self
    }
}

/// Everything a graph execution produced.
///
/// `results` has one entry per launched task. Tasks in batches that were
/// never reached have no entry and must be read as "not attempted".
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub plan_id: String,
    pub graph_id: String,
    pub status: PlanStatus,
    pub results: HashMap<TaskId, ExecutionResult>,
    /// Tasks not launched because a dependency did not succeed.
    pub skipped: Vec<TaskId>,
    pub batches_run: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration: Duration,
}

impl ExecutionReport {
    pub fn is_completed(&self) -> bool {
        self.status == PlanStatus::Completed
    }

    /// Completed, nothing skipped, and every launched task succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.is_completed()
            && self.skipped.is_empty()
            && self.results.values().all(ExecutionResult::is_success)
    }

    pub fn result(&self, task: &str) -> Option<&ExecutionResult> {
        self.results.get(task)
    }
}

/// Settings resolved by the orchestrator before a run.
#[derive(Debug, Clone)]
pub(crate) struct RunSettings {
    pub default_timeout: Option<Duration>,
    pub budget: Arc<ResourceBudget>,
    pub policy: DependencyFailurePolicy,
}

/// Execute `plan` batch by batch.
///
/// Batch N+1 is launched only after every task of batch N has settled. If a
/// task on the critical path does not succeed, later batches are not
/// launched and the run is `Aborted`; results already gathered are kept.
///
/// Dropping the future cancels the handlers' token and aborts the running
/// batch. Nothing is reported for a dropped run.
pub(crate) async fn run_plan(
    plan: &ExecutionPlan,
    handlers: &HashMap<String, Arc<dyn TaskHandler>>,
    options: RunOptions,
    settings: RunSettings,
) -> ExecutionReport {
    let started_at = Utc::now();
    let clock = Instant::now();
    let events = EventSink::new(options.events.clone());

    // Handlers see a child of the caller's token, cancelled if this future
    // is dropped before the run finishes.
    let cancel = options.cancel.child_token();
    let cancel_on_drop = cancel.clone().drop_guard();
    let ctx = TaskContext::new(options.context, cancel.clone()).for_run(&plan.graph_id, &plan.id);

    info!(
        graph_id = %plan.graph_id,
        plan_id = %plan.id,
        batches = plan.parallel_groups.len(),
        "executing plan"
    );

    events
        .emit(ExecutionEvent::PlanStarted {
            plan_id: plan.id.clone(),
            graph_id: plan.graph_id.clone(),
            batches: plan.parallel_groups.len(),
        })
        .await;
    for task in plan.tasks() {
        events.task_state(&task.id, TaskState::Pending, 0).await;
    }

    let mut results: HashMap<TaskId, ExecutionResult> = HashMap::new();
    let mut not_succeeded: HashSet<TaskId> = HashSet::new();
    let mut skipped: Vec<TaskId> = Vec::new();
    let mut batches_run = 0;
    let mut status = PlanStatus::Completed;

    for (index, batch) in plan.parallel_groups.iter().enumerate() {
        if cancel.is_cancelled() {
            status = PlanStatus::Cancelled;
            break;
        }

        let mut launch: Vec<BoundTask> = Vec::with_capacity(batch.len());
        let mut critical_failure: Option<TaskId> = None;

        for task in batch {
            let failed_dep = match settings.policy {
                DependencyFailurePolicy::Continue => None,
                DependencyFailurePolicy::SkipDependents => task
                    .dependencies
                    .iter()
                    .find(|d| not_succeeded.contains(d.as_str())),
            };

            if let Some(dep) = failed_dep {
                warn!(
                    task = %task.id,
                    dependency = %dep,
                    "dependency did not succeed; skipping task"
                );
                events
                    .emit(ExecutionEvent::TaskSkipped {
                        task_id: task.id.clone(),
                        failed_dependency: dep.clone(),
                    })
                    .await;
                skipped.push(task.id.clone());
                not_succeeded.insert(task.id.clone());
                if critical_failure.is_none() && plan.is_on_critical_path(&task.id) {
                    critical_failure = Some(task.id.clone());
                }
                continue;
            }

            // Every type was resolved before the run started.
            if let Some(handler) = handlers.get(task.task_type.as_str()) {
                launch.push(BoundTask {
                    task: Arc::new(task.clone()),
                    handler: Arc::clone(handler),
                });
            }
        }

        let ids: Vec<TaskId> = launch.iter().map(|b| b.task.id.clone()).collect();
        info!(
            plan_id = %plan.id,
            batch = index,
            tasks = ?ids,
            "launching batch"
        );
        events
            .emit(ExecutionEvent::BatchStarted { index, tasks: ids })
            .await;

        let batch_results = run_batch(
            launch,
            &ctx,
            &settings.budget,
            settings.default_timeout,
            &events,
        )
        .await;
        batches_run += 1;

        let mut succeeded = 0;
        let mut failed = 0;
        for result in batch_results {
            if result.is_success() {
                succeeded += 1;
            } else {
                failed += 1;
                not_succeeded.insert(result.task_id.clone());
                if critical_failure.is_none() && plan.is_on_critical_path(&result.task_id) {
                    critical_failure = Some(result.task_id.clone());
                }
            }
            results.insert(result.task_id.clone(), result);
        }

        events
            .emit(ExecutionEvent::BatchCompleted {
                index,
                succeeded,
                failed,
            })
            .await;

        if cancel.is_cancelled() {
            status = PlanStatus::Cancelled;
            break;
        }

        if let Some(failed_task) = critical_failure {
            error!(
                plan_id = %plan.id,
                batch = index,
                task = %failed_task,
                remaining_batches = plan.parallel_groups.len() - index - 1,
                "critical-path task did not succeed; aborting remaining batches"
            );
            status = PlanStatus::Aborted { failed_task };
            break;
        }
    }

    cancel_on_drop.disarm();
    let finished_at = Utc::now();
    let duration = clock.elapsed();

    info!(
        plan_id = %plan.id,
        ?status,
        launched = results.len(),
        skipped = skipped.len(),
        batches_run,
        duration_ms = duration.as_millis() as u64,
        "plan execution finished"
    );

    events
        .emit(ExecutionEvent::PlanFinished {
            plan_id: plan.id.clone(),
            status: status.clone(),
        })
        .await;

    ExecutionReport {
        plan_id: plan.id.clone(),
        graph_id: plan.graph_id.clone(),
        status,
        results,
        skipped,
        batches_run,
        started_at,
        finished_at,
        duration,
    }
}
