// src/exec/batch.rs

//! Concurrent execution of one batch.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::AbortHandle;
use tracing::{debug, error};

use crate::dag::TaskNode;
use crate::engine::EventSink;
use crate::exec::admission::ResourceBudget;
use crate::exec::handler::{TaskContext, TaskHandler};
use crate::exec::result::ExecutionResult;
use crate::exec::task_runner::execute_task;

/// A task paired with the handler that will serve it.
#[derive(Clone)]
pub struct BoundTask {
    pub task: Arc<TaskNode>,
    pub handler: Arc<dyn TaskHandler>,
}

/// Launch every task of the batch at once and wait for all of them to settle.
///
/// Each task runs in its own Tokio task; siblings are not ordered relative
/// to each other. Results come back in batch order. Dropping the returned
/// future aborts every task of the batch that has not settled.
pub async fn run_batch(
    tasks: Vec<BoundTask>,
    ctx: &TaskContext,
    budget: &Arc<ResourceBudget>,
    default_timeout: Option<Duration>,
    events: &EventSink,
) -> Vec<ExecutionResult> {
    let launched_at = Utc::now();

    let handles: Vec<_> = tasks
        .into_iter()
        .map(|bound| {
            let task_id = bound.task.id.clone();
            let ctx = ctx.clone();
            let budget = Arc::clone(budget);
            let events = events.clone();

            let handle = tokio::spawn(async move {
                execute_task(
                    &bound.task,
                    bound.handler.as_ref(),
                    &ctx,
                    &budget,
                    default_timeout,
                    &events,
                )
                .await
            });

            debug!(task = %task_id, "task launched");
            (task_id, handle)
        })
        .collect();

    let _abort_on_drop = AbortOnDrop(handles.iter().map(|(_, h)| h.abort_handle()).collect());

    let mut results = Vec::with_capacity(handles.len());
    for (task_id, handle) in handles {
        match handle.await {
            Ok(result) => results.push(result),
            Err(join_err) => {
                error!(task = %task_id, error = %join_err, "task runner did not complete");
                results.push(ExecutionResult::lost(
                    task_id,
                    launched_at,
                    format!("task runner did not complete: {join_err}"),
                ));
            }
        }
    }

    results
}

/// Aborts the batch's tasks when dropped. Aborting a finished task is a no-op.
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}
