// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the graph store and planner
//! - the batch-by-batch plan runner
//! - the execution history and stats
//!
//! [`Orchestrator`] is the entry point; there is no process-wide instance.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::dag::TaskId;

/// Per-task lifecycle during a graph execution.
///
/// `Pending -> Running -> {Success | Failure | Timeout | Cancelled}`, with
/// `Running -> Retrying -> Running` between failed attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Pending,
    Running,
    Retrying,
    Success,
    Failure,
    Timeout,
    Cancelled,
}

/// How a plan execution ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PlanStatus {
    /// Every batch ran.
    Completed,
    /// A task on the critical path did not succeed; later batches were not
    /// launched.
    Aborted { failed_task: TaskId },
    /// The cancellation token fired.
    Cancelled,
}

/// Events emitted while a plan executes.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEvent {
    PlanStarted {
        plan_id: String,
        graph_id: String,
        batches: usize,
    },
    BatchStarted {
        index: usize,
        tasks: Vec<TaskId>,
    },
    TaskStateChanged {
        task_id: TaskId,
        state: TaskState,
        attempt: u32,
    },
    TaskSkipped {
        task_id: TaskId,
        failed_dependency: TaskId,
    },
    BatchCompleted {
        index: usize,
        succeeded: usize,
        failed: usize,
    },
    PlanFinished {
        plan_id: String,
        status: PlanStatus,
    },
}

/// Optional event channel. Sends are best effort: a dropped receiver is
/// not an error.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::Sender<ExecutionEvent>>,
}

impl EventSink {
    pub fn new(tx: Option<mpsc::Sender<ExecutionEvent>>) -> Self {
        Self { tx }
    }

    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub async fn emit(&self, event: ExecutionEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event).await;
        }
    }

    pub async fn task_state(&self, task_id: &str, state: TaskState, attempt: u32) {
        if self.tx.is_some() {
            self.emit(ExecutionEvent::TaskStateChanged {
                task_id: task_id.to_string(),
                state,
                attempt,
            })
            .await;
        }
    }
}

pub mod history;
pub mod orchestrator;
pub mod runner;
pub mod stats;

pub use history::{ExecutionHistory, RunRecord};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use runner::{ExecutionReport, RunOptions};
pub use stats::{GroupStats, StatsReport, StatsSummary, default_group_key};
