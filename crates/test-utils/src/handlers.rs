//! Deterministic fake task handlers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail};
use serde_json::json;
use taskdag::dag::TaskNode;
use taskdag::exec::{HandlerFuture, HandlerResult, TaskContext, TaskHandler};

/// Shared, ordered log of `(task_id, attempt)` handler invocations.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<(String, u32)>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, task_id: &str, attempt: u32) {
        self.calls
            .lock()
            .unwrap()
            .push((task_id.to_string(), attempt));
    }

    /// Task ids in invocation order, one entry per attempt.
    pub fn task_ids(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn attempts_of(&self, task_id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == task_id)
            .count()
    }

    pub fn was_called(&self, task_id: &str) -> bool {
        self.attempts_of(task_id) > 0
    }

    pub fn len(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy)]
enum Script {
    /// Fail the first `n` attempts, then succeed.
    FailFirst(u32),
    AlwaysFail,
}

/// A handler whose outcome per task id is scripted up front.
///
/// - Unscripted tasks succeed with `{"task": <id>, "attempt": <n>}`.
/// - Every invocation is recorded in [`CallLog`].
/// - An optional delay is slept before answering (tokio time, so it is
///   instant under a paused clock).
#[derive(Debug, Clone, Default)]
pub struct ScriptedHandler {
    scripts: HashMap<String, Script>,
    delays: HashMap<String, Duration>,
    default_delay: Duration,
    log: CallLog,
}

impl ScriptedHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(log: CallLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub fn fail_first(mut self, task_id: &str, failures: u32) -> Self {
        self.scripts.insert(task_id.to_string(), Script::FailFirst(failures));
        self
    }

    pub fn always_fail(mut self, task_id: &str) -> Self {
        self.scripts.insert(task_id.to_string(), Script::AlwaysFail);
        self
    }

    pub fn delay(mut self, task_id: &str, delay: Duration) -> Self {
        self.delays.insert(task_id.to_string(), delay);
        self
    }

    pub fn default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }
}

impl TaskHandler for ScriptedHandler {
    fn handle<'a>(&'a self, task: &'a TaskNode, ctx: &'a TaskContext) -> HandlerFuture<'a> {
        Box::pin(async move {
            self.log.record(&task.id, ctx.attempt);

            let delay = self
                .delays
                .get(&task.id)
                .copied()
                .unwrap_or(self.default_delay);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            match self.scripts.get(&task.id) {
                Some(Script::AlwaysFail) => bail!("scripted failure for {}", task.id),
                Some(Script::FailFirst(n)) if ctx.attempt <= *n => {
                    bail!("scripted failure {} of {} for {}", ctx.attempt, n, task.id)
                }
                _ => Ok(json!({ "task": task.id, "attempt": ctx.attempt })),
            }
        })
    }
}

/// Tracks how many invocations are in flight at once.
///
/// Each call holds its slot for `hold` (tokio time) before succeeding.
#[derive(Debug, Clone)]
pub struct ConcurrencyProbe {
    hold: Duration,
    current: Arc<AtomicUsize>,
    max: Arc<AtomicUsize>,
    log: CallLog,
}

impl ConcurrencyProbe {
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            current: Arc::new(AtomicUsize::new(0)),
            max: Arc::new(AtomicUsize::new(0)),
            log: CallLog::new(),
        }
    }

    /// Highest number of simultaneous invocations observed.
    pub fn max_observed(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }
}

impl TaskHandler for ConcurrencyProbe {
    fn handle<'a>(&'a self, task: &'a TaskNode, ctx: &'a TaskContext) -> HandlerFuture<'a> {
        Box::pin(async move {
            self.log.record(&task.id, ctx.attempt);
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.max.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(self.hold).await;

            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(json!({ "task": task.id }))
        })
    }
}

/// Never finishes on its own; returns an error once the context is
/// cancelled. Used for timeout and cancellation tests.
#[derive(Debug, Clone, Default)]
pub struct PendingHandler {
    log: CallLog,
}

impl PendingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }
}

impl TaskHandler for PendingHandler {
    fn handle<'a>(&'a self, task: &'a TaskNode, ctx: &'a TaskContext) -> HandlerFuture<'a> {
        Box::pin(async move {
            self.log.record(&task.id, ctx.attempt);
            ctx.cancel.cancelled().await;
            Err::<serde_json::Value, _>(anyhow!("{} observed cancellation", task.id))
        })
    }
}

/// Panics on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanickingHandler;

impl TaskHandler for PanickingHandler {
    fn handle<'a>(&'a self, task: &'a TaskNode, _ctx: &'a TaskContext) -> HandlerFuture<'a> {
        Box::pin(async move { explode(task) })
    }
}

fn explode(task: &TaskNode) -> HandlerResult {
    panic!("handler exploded on {}", task.id)
}
