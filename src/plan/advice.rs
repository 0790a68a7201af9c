// src/plan/advice.rs

//! Advisory notes attached to a plan. Nothing here changes the plan.

use std::time::Duration;

use crate::dag::TaskNode;
use crate::plan::model::{PlanConstraints, ResourcePeak, ResourceRequirements};
use crate::plan::planner::PlannerOptions;
use crate::types::ResourceLimits;

pub fn advise(
    batches: &[Vec<TaskNode>],
    requirements: &ResourceRequirements,
    total_estimated_time: Duration,
    constraints: &PlanConstraints,
    options: &PlannerOptions,
) -> Vec<String> {
    let mut notes = Vec::new();

    for (index, batch) in batches.iter().enumerate() {
        let ai = batch.iter().filter(|t| t.task_type.is_ai_request()).count();
        if ai >= 2 {
            notes.push(format!(
                "batch {index} has {ai} ai_request tasks; consider batching them into fewer provider calls"
            ));
        }
    }

    let long: Vec<&str> = batches
        .iter()
        .flatten()
        .filter(|t| t.estimated_duration > options.checkpoint_threshold)
        .map(|t| t.id.as_str())
        .collect();
    if !long.is_empty() {
        notes.push(format!(
            "enable checkpointing for tasks estimated over {}ms: {}",
            options.checkpoint_threshold.as_millis(),
            long.join(", ")
        ));
    }

    if requirements.peak.gpu > 0 {
        notes.push(format!(
            "{} task(s) require a GPU; make sure GPU capacity is reserved",
            requirements.peak.gpu
        ));
    }

    let task_count: usize = batches.iter().map(Vec::len).sum();
    if task_count > 1 && batches.iter().all(|b| b.len() == 1) {
        notes.push("graph is fully sequential; no tasks can run in parallel".to_string());
    }

    if let Some(max) = constraints.max_parallel_tasks {
        let widest = batches.iter().map(Vec::len).max().unwrap_or(0);
        if widest > max {
            notes.push(format!(
                "widest batch has {widest} tasks but max_parallel_tasks is {max}; tasks will be admitted {max} at a time"
            ));
        }
    }

    if let Some(limit) = constraints.max_execution_time {
        if total_estimated_time > limit {
            notes.push(format!(
                "estimated total time {}ms exceeds max_execution_time {}ms",
                total_estimated_time.as_millis(),
                limit.as_millis()
            ));
        }
    }

    if let Some(limits) = constraints.resource_limits {
        notes.extend(limit_notes(batches, &requirements.peak, &limits));
    }

    notes
}

fn limit_notes(batches: &[Vec<TaskNode>], peak: &ResourcePeak, limits: &ResourceLimits) -> Vec<String> {
    let mut notes = Vec::new();

    let dims = [
        ("memory", peak.memory, limits.memory),
        ("cpu", peak.cpu, limits.cpu),
        ("gpu", peak.gpu, limits.gpu),
        ("storage", peak.storage, limits.storage),
    ];
    for (name, peak, limit) in dims {
        if let Some(limit) = limit {
            if peak > limit {
                notes.push(format!(
                    "peak {name} demand {peak} exceeds the limit of {limit}"
                ));
            }
        }
    }

    for task in batches.iter().flatten() {
        let r = &task.required_resources;
        let over = [
            ("memory", r.memory, limits.memory),
            ("cpu", r.cpu, limits.cpu),
            ("gpu", u32::from(r.gpu), limits.gpu),
            ("storage", r.storage.unwrap_or(0), limits.storage),
        ]
        .into_iter()
        .filter(|(_, need, limit)| limit.is_some_and(|l| *need > l))
        .map(|(name, _, _)| name)
        .collect::<Vec<_>>();

        if !over.is_empty() {
            notes.push(format!(
                "task {} needs more {} than the budget allows; it will run alone with its demand clamped",
                task.id,
                over.join("/")
            ));
        }
    }

    notes
}
