// src/plan/model.rs

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dag::{TaskId, TaskNode};
use crate::types::ResourceLimits;

/// Caller-supplied limits for planning and execution.
///
/// The planner only reports on them; the runner enforces
/// `max_parallel_tasks` and `resource_limits` through admission control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanConstraints {
    pub max_parallel_tasks: Option<usize>,
    pub max_execution_time: Option<Duration>,
    pub resource_limits: Option<ResourceLimits>,
}

/// Per-resource maxima across all tasks of a graph.
///
/// `gpu` is the number of tasks that need a GPU.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResourcePeak {
    pub memory: u32,
    pub cpu: u32,
    pub gpu: u32,
    pub storage: u32,
}

/// Per-resource means across all tasks of a graph.
///
/// `gpu` is the fraction of tasks that need a GPU.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ResourceAverage {
    pub memory: f64,
    pub cpu: f64,
    pub gpu: f64,
    pub storage: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ResourceRequirements {
    pub peak: ResourcePeak,
    pub average: ResourceAverage,
}

/// Immutable execution plan derived from one task graph.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionPlan {
    pub id: String,
    pub graph_id: String,
    pub created_at: DateTime<Utc>,
    /// Sum over batches of the longest estimate in each batch.
    pub total_estimated_time: Duration,
    /// Ordered batches; every dependency of a task sits in an earlier batch.
    pub parallel_groups: Vec<Vec<TaskNode>>,
    /// Longest cumulative-duration dependency chain, root first.
    pub critical_path: Vec<TaskId>,
    pub critical_path_duration: Duration,
    pub resource_requirements: ResourceRequirements,
    /// Advisory notes; they never change the plan.
    pub optimizations: Vec<String>,
    pub constraints: PlanConstraints,
}

impl ExecutionPlan {
    pub fn task_count(&self) -> usize {
        self.parallel_groups.iter().map(Vec::len).sum()
    }

    pub fn is_on_critical_path(&self, task: &str) -> bool {
        self.critical_path.iter().any(|id| id == task)
    }

    /// Batches as lists of task ids.
    pub fn batch_ids(&self) -> Vec<Vec<TaskId>> {
        self.parallel_groups
            .iter()
            .map(|batch| batch.iter().map(|t| t.id.clone()).collect())
            .collect()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &TaskNode> {
        self.parallel_groups.iter().flatten()
    }
}
