// src/dag/task.rs

//! Task definitions as stored in a graph.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::types::{BackoffStrategy, TaskType};

/// Canonical task id type used throughout the crate.
pub type TaskId = String;

/// Opaque key/value bag handed to the task handler.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Declared resource demand of a task.
///
/// Used for planning estimates and admission control; nothing is enforced
/// at the OS level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RequiredResources {
    /// Memory in MB.
    pub memory: u32,
    /// CPU cores.
    pub cpu: u32,
    /// Whether the task needs a GPU.
    pub gpu: bool,
    /// Storage in MB.
    pub storage: Option<u32>,
}

/// Retry behaviour for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub backoff_strategy: BackoffStrategy,
    pub initial_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff_strategy: BackoffStrategy::Exponential,
            initial_delay: Duration::from_millis(100),
        }
    }
}

/// A unit of work in a task graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskNode {
    pub id: TaskId,
    pub name: String,
    pub task_type: TaskType,
    /// Ids of tasks that must finish before this one starts.
    pub dependencies: Vec<TaskId>,
    /// Reserved for planner extensions; not used for ordering.
    pub priority: i32,
    /// Planning estimate only.
    pub estimated_duration: Duration,
    pub required_resources: RequiredResources,
    pub retry_config: RetryConfig,
    /// Per-attempt timeout; falls back to the orchestrator default.
    pub timeout: Option<Duration>,
    pub metadata: Metadata,
}

impl TaskNode {
    pub fn new(id: impl Into<TaskId>, task_type: impl Into<TaskType>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            task_type: task_type.into(),
            dependencies: Vec::new(),
            priority: 0,
            estimated_duration: Duration::ZERO,
            required_resources: RequiredResources::default(),
            retry_config: RetryConfig::default(),
            timeout: None,
            metadata: Metadata::new(),
        }
    }
}
