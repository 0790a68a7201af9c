// src/exec/result.rs

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dag::TaskId;

/// Terminal status of one task execution (all attempts included).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failure,
    Timeout,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_success(self) -> bool {
        self == ExecutionStatus::Success
    }
}

/// Resources granted to a task by admission control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResourceUsage {
    pub memory: u32,
    pub cpu: u32,
    pub gpu: u32,
    pub storage: u32,
}

/// Outcome of running one task to success or retry exhaustion.
///
/// Times cover the whole retry sequence: `start_time` is when the first
/// attempt began and `end_time` when the last one settled.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub task_id: TaskId,
    pub status: ExecutionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration: Duration,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub resource_usage: ResourceUsage,
    /// Number of handler invocations.
    pub attempts: u32,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Result for a task whose runner died before reporting.
    pub(crate) fn lost(task_id: TaskId, started: DateTime<Utc>, error: String) -> Self {
        let end_time = Utc::now();
        Self {
            task_id,
            status: ExecutionStatus::Failure,
            start_time: started,
            end_time,
            duration: (end_time - started).to_std().unwrap_or_default(),
            result: None,
            error: Some(error),
            resource_usage: ResourceUsage::default(),
            attempts: 0,
        }
    }
}
