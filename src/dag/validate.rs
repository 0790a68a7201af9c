// src/dag/validate.rs

//! Structural validation of a task set before it is accepted as a graph.

use std::collections::HashSet;

use petgraph::graphmap::DiGraphMap;
use petgraph::visit::{Control, DfsEvent, depth_first_search};
use tracing::debug;

use crate::dag::task::TaskNode;
use crate::errors::{Result, TaskdagError};

/// Run every structural check on `tasks`, in order:
/// unique ids, known dependencies, acyclicity.
pub fn validate_tasks(graph_id: &str, tasks: &[TaskNode]) -> Result<()> {
    if graph_id.trim().is_empty() {
        return Err(TaskdagError::InvalidGraph(
            "graph id must not be empty".to_string(),
        ));
    }
    ensure_unique_ids(graph_id, tasks)?;
    ensure_known_dependencies(graph_id, tasks)?;
    validate_dag(graph_id, tasks)
}

fn ensure_unique_ids(graph_id: &str, tasks: &[TaskNode]) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();
    for task in tasks {
        if !seen.insert(task.id.as_str()) {
            return Err(TaskdagError::DuplicateTask {
                graph_id: graph_id.to_string(),
                task: task.id.clone(),
            });
        }
    }
    Ok(())
}

fn ensure_known_dependencies(graph_id: &str, tasks: &[TaskNode]) -> Result<()> {
    let ids: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    for task in tasks {
        for dep in &task.dependencies {
            if !ids.contains(dep.as_str()) {
                return Err(TaskdagError::UnknownDependency {
                    graph_id: graph_id.to_string(),
                    task: task.id.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Reject the task set if its dependency edges contain a cycle.
///
/// Edge direction: task -> dependency. The depth-first search starts from
/// every task in input order, so disjoint cyclic components are found too.
/// A back edge (an edge to a node still on the DFS stack) closes a cycle;
/// a self-dependency is the one-node case of this.
pub fn validate_dag(graph_id: &str, tasks: &[TaskNode]) -> Result<()> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for task in tasks {
        graph.add_node(task.id.as_str());
    }

    for task in tasks {
        for dep in &task.dependencies {
            graph.add_edge(task.id.as_str(), dep.as_str(), ());
        }
    }

    let starts = tasks.iter().map(|t| t.id.as_str());
    let outcome = depth_first_search(&graph, starts, |event| match event {
        DfsEvent::BackEdge(task, dependency) => Control::Break((task, dependency)),
        _ => Control::Continue,
    });

    match outcome.break_value() {
        Some((task, dependency)) => Err(TaskdagError::DagCycle {
            graph_id: graph_id.to_string(),
            task: task.to_string(),
            dependency: dependency.to_string(),
        }),
        None => {
            debug!(graph_id, tasks = tasks.len(), "dependency graph is acyclic");
            Ok(())
        }
    }
}
