// src/plan/planner.rs

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::dag::{TaskGraph, TaskNode};
use crate::errors::{Result, TaskdagError};
use crate::plan::advice::advise;
use crate::plan::critical_path::critical_path;
use crate::plan::model::{ExecutionPlan, PlanConstraints};
use crate::plan::resources::estimate_resources;

/// Default estimate above which a task is flagged for checkpointing.
pub const DEFAULT_CHECKPOINT_THRESHOLD: Duration = Duration::from_secs(30);

/// Planner tuning that is not part of the per-call constraints.
#[derive(Debug, Clone, Copy)]
pub struct PlannerOptions {
    pub checkpoint_threshold: Duration,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            checkpoint_threshold: DEFAULT_CHECKPOINT_THRESHOLD,
        }
    }
}

/// Build an execution plan for a validated graph.
///
/// The graph is only read. For an unchanged graph and equal constraints the
/// batches and critical path are identical across calls; only `id` and
/// `created_at` differ.
pub fn plan_execution(
    graph: &TaskGraph,
    constraints: PlanConstraints,
    options: &PlannerOptions,
) -> Result<ExecutionPlan> {
    let tasks: Vec<TaskNode> = graph.tasks().cloned().collect();

    let parallel_groups = partition_batches(graph.id(), &tasks)?;
    let total_estimated_time = total_estimated_time(&parallel_groups);

    // Concatenated batches are a topological order.
    let topo: Vec<&TaskNode> = parallel_groups.iter().flatten().collect();
    let (critical_path, critical_path_duration) = critical_path(&topo);

    let resource_requirements = estimate_resources(&tasks);
    let optimizations = advise(
        &parallel_groups,
        &resource_requirements,
        total_estimated_time,
        &constraints,
        options,
    );

    let plan = ExecutionPlan {
        id: Uuid::new_v4().to_string(),
        graph_id: graph.id().to_string(),
        created_at: Utc::now(),
        total_estimated_time,
        parallel_groups,
        critical_path,
        critical_path_duration,
        resource_requirements,
        optimizations,
        constraints,
    };

    info!(
        graph_id = %plan.graph_id,
        plan_id = %plan.id,
        batches = plan.parallel_groups.len(),
        tasks = plan.task_count(),
        critical_path = ?plan.critical_path,
        total_estimated_ms = plan.total_estimated_time.as_millis() as u64,
        "execution plan created"
    );

    Ok(plan)
}

/// Split tasks into ordered batches.
///
/// Each scan collects every unplaced task whose dependencies were all placed
/// in earlier batches; those tasks form the next batch. A scan that finds
/// nothing while tasks remain is a [`TaskdagError::PlannerDeadlock`], which
/// cannot happen for a graph that passed validation.
pub fn partition_batches(graph_id: &str, tasks: &[TaskNode]) -> Result<Vec<Vec<TaskNode>>> {
    let mut placed: HashSet<&str> = HashSet::new();
    let mut remaining: Vec<&TaskNode> = tasks.iter().collect();
    let mut batches: Vec<Vec<TaskNode>> = Vec::new();

    while !remaining.is_empty() {
        let (eligible, rest): (Vec<&TaskNode>, Vec<&TaskNode>) = remaining
            .into_iter()
            .partition(|t| t.dependencies.iter().all(|d| placed.contains(d.as_str())));

        if eligible.is_empty() {
            let unplaced: Vec<String> = rest.iter().map(|t| t.id.clone()).collect();
            error!(
                graph_id,
                ?unplaced,
                "planner found no eligible tasks while tasks remain unplaced"
            );
            return Err(TaskdagError::PlannerDeadlock {
                graph_id: graph_id.to_string(),
                unplaced,
            });
        }

        for task in &eligible {
            placed.insert(task.id.as_str());
        }

        debug!(
            graph_id,
            batch = batches.len(),
            tasks = ?eligible.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
            "batch formed"
        );

        batches.push(eligible.into_iter().cloned().collect());
        remaining = rest;
    }

    Ok(batches)
}

/// Sum over batches of the longest estimate in the batch.
pub fn total_estimated_time(batches: &[Vec<TaskNode>]) -> Duration {
    batches
        .iter()
        .map(|batch| {
            batch
                .iter()
                .map(|t| t.estimated_duration)
                .max()
                .unwrap_or(Duration::ZERO)
        })
        .sum()
}
