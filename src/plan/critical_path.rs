// src/plan/critical_path.rs

//! Longest cumulative-duration chain through the graph.

use std::collections::HashMap;
use std::time::Duration;

use crate::dag::{TaskId, TaskNode};

/// Compute the critical path over tasks given in topological order.
///
/// A single forward pass records, for every task, the longest cumulative
/// estimate of any chain ending at it and the predecessor on that chain.
/// Ties keep the earliest candidate: the first dependency in the task's
/// `dependencies` list, and the first end task in `topo` order.
///
/// Returns the path root first, plus its total estimate.
pub fn critical_path(topo: &[&TaskNode]) -> (Vec<TaskId>, Duration) {
    let mut cumulative: HashMap<&str, Duration> = HashMap::with_capacity(topo.len());
    let mut predecessor: HashMap<&str, &str> = HashMap::new();

    for task in topo {
        let mut best: Option<(&str, Duration)> = None;
        for dep in &task.dependencies {
            let Some(&dep_total) = cumulative.get(dep.as_str()) else {
                continue;
            };
            if best.is_none_or(|(_, b)| dep_total > b) {
                best = Some((dep.as_str(), dep_total));
            }
        }

        let base = match best {
            Some((dep, total)) => {
                predecessor.insert(task.id.as_str(), dep);
                total
            }
            None => Duration::ZERO,
        };
        cumulative.insert(task.id.as_str(), base + task.estimated_duration);
    }

    let mut end: Option<(&str, Duration)> = None;
    for task in topo {
        let total = cumulative[task.id.as_str()];
        if end.is_none_or(|(_, b)| total > b) {
            end = Some((task.id.as_str(), total));
        }
    }

    let Some((end_id, total)) = end else {
        return (Vec::new(), Duration::ZERO);
    };

    let mut path: Vec<TaskId> = vec![end_id.to_string()];
    let mut current = end_id;
    while let Some(&prev) = predecessor.get(current) {
        path.push(prev.to_string());
        current = prev;
    }
    path.reverse();

    (path, total)
}
