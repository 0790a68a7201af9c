// src/exec/task_runner.rs

//! Runs a single task through its retry sequence.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::dag::TaskNode;
use crate::engine::{EventSink, TaskState};
use crate::exec::admission::{ResourceBudget, ResourceGuard};
use crate::exec::handler::{TaskContext, TaskHandler};
use crate::exec::result::{ExecutionResult, ExecutionStatus, ResourceUsage};
use crate::exec::retry::backoff_delay;

/// Outcome of one handler invocation.
enum Attempt {
    Succeeded(serde_json::Value),
    Failed(String),
    TimedOut(String),
    Cancelled,
}

/// Run `task` until it succeeds or its retries are exhausted.
///
/// Never returns an error: handler failures, timeouts and cancellation all
/// end up in the returned [`ExecutionResult`]. Timing covers the whole
/// sequence, from the first attempt's start to the last attempt's end.
///
/// Each attempt is admitted against `budget` first and releases its
/// admission when the handler settles, however it settles. A task cancelled
/// while waiting for admission reports the attempts it had already made. Between failed
/// attempts the task sleeps for the backoff delay; the sleep only suspends
/// this task. `ctx.cancel` is checked before every attempt and raced against
/// admission, the handler call and the backoff sleep.
pub async fn execute_task(
    task: &TaskNode,
    handler: &dyn TaskHandler,
    ctx: &TaskContext,
    budget: &Arc<ResourceBudget>,
    default_timeout: Option<Duration>,
    events: &EventSink,
) -> ExecutionResult {
    let start_time = Utc::now();
    let clock = Instant::now();
    let timeout = task.timeout.or(default_timeout);
    let max_retries = task.retry_config.max_retries;

    let mut attempts: u32 = 0;
    let mut usage = ResourceUsage::default();

    let (status, result, error) = loop {
        if ctx.cancel.is_cancelled() {
            break (
                ExecutionStatus::Cancelled,
                None,
                Some(format!("cancelled before attempt {}", attempts + 1)),
            );
        }

        // A task still waiting for resources has not made an attempt.
        let admitted = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                break (
                    ExecutionStatus::Cancelled,
                    None,
                    Some(format!("cancelled while waiting for resources for attempt {}", attempts + 1)),
                );
            }
            admitted = budget.admit(task) => admitted,
        };

        attempts += 1;
        let attempt_ctx = ctx.for_attempt(attempts);
        events.task_state(&task.id, TaskState::Running, attempts).await;
        debug!(task = %task.id, attempt = attempts, "starting attempt");

        let outcome = match admitted {
            Ok(guard) => {
                usage = guard.usage();
                run_attempt(task, handler, &attempt_ctx, guard, timeout).await
            }
            Err(err) => Attempt::Failed(err.to_string()),
        };

        let (message, timed_out) = match outcome {
            Attempt::Succeeded(value) => break (ExecutionStatus::Success, Some(value), None),
            Attempt::Cancelled => {
                break (
                    ExecutionStatus::Cancelled,
                    None,
                    Some(format!("cancelled during attempt {attempts}")),
                );
            }
            Attempt::Failed(message) => (message, false),
            Attempt::TimedOut(message) => (message, true),
        };

        if attempts > max_retries {
            let status = if timed_out {
                ExecutionStatus::Timeout
            } else {
                ExecutionStatus::Failure
            };
            break (status, None, Some(message));
        }

        let delay = backoff_delay(&task.retry_config, attempts);
        warn!(
            task = %task.id,
            attempt = attempts,
            max_attempts = max_retries + 1,
            delay_ms = delay.as_millis() as u64,
            error = %message,
            "attempt failed; retrying after backoff"
        );
        events.task_state(&task.id, TaskState::Retrying, attempts).await;

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = ctx.cancel.cancelled() => {
                break (
                    ExecutionStatus::Cancelled,
                    None,
                    Some(format!("cancelled while waiting to retry after: {message}")),
                );
            }
        }
    };

    let end_time = Utc::now();
    let duration = clock.elapsed();

    let final_state = match status {
        ExecutionStatus::Success => TaskState::Success,
        ExecutionStatus::Failure => TaskState::Failure,
        ExecutionStatus::Timeout => TaskState::Timeout,
        ExecutionStatus::Cancelled => TaskState::Cancelled,
    };
    events.task_state(&task.id, final_state, attempts).await;

    match status {
        ExecutionStatus::Success => info!(
            task = %task.id,
            attempts,
            duration_ms = duration.as_millis() as u64,
            "task succeeded"
        ),
        _ => warn!(
            task = %task.id,
            ?status,
            attempts,
            duration_ms = duration.as_millis() as u64,
            error = error.as_deref().unwrap_or(""),
            "task did not succeed"
        ),
    }

    ExecutionResult {
        task_id: task.id.clone(),
        status,
        start_time,
        end_time,
        duration,
        result,
        error,
        resource_usage: usage,
        attempts,
    }
}

/// One admitted handler invocation. `guard` is released when it settles.
async fn run_attempt(
    task: &TaskNode,
    handler: &dyn TaskHandler,
    ctx: &TaskContext,
    guard: ResourceGuard,
    timeout: Option<Duration>,
) -> Attempt {
    let call = AssertUnwindSafe(handler.handle(task, ctx)).catch_unwind();

    let outcome = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => Attempt::Cancelled,
        settled = within(timeout, call) => match settled {
            None => Attempt::TimedOut(format!(
                "attempt timed out after {}ms",
                timeout.unwrap_or_default().as_millis()
            )),
            Some(Ok(Ok(value))) => Attempt::Succeeded(value),
            Some(Ok(Err(err))) => Attempt::Failed(format!("{err:#}")),
            Some(Err(panic)) => Attempt::Failed(format!("handler panicked: {}", panic_message(&*panic))),
        },
    };

    drop(guard);
    debug!(task = %task.id, attempt = ctx.attempt, "resources released");

    outcome
}

async fn within<F: Future>(limit: Option<Duration>, fut: F) -> Option<F::Output> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.ok(),
        None => Some(fut.await),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
