// src/dag/graph.rs

use std::collections::{HashMap, HashSet};

use crate::dag::task::{TaskId, TaskNode};
use crate::dag::validate::validate_tasks;
use crate::errors::Result;

/// Internal node structure: the task plus its immediate dependents.
#[derive(Debug, Clone)]
struct GraphNode {
    task: TaskNode,
    /// Direct dependents: tasks that list this one in `dependencies`.
    dependents: Vec<TaskId>,
}

/// Validated, immutable task graph keyed by task id.
///
/// Tasks are iterated in the order they were supplied, which is what makes
/// planning deterministic for a fixed input.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    id: String,
    order: Vec<TaskId>,
    nodes: HashMap<TaskId, GraphNode>,
}

impl TaskGraph {
    /// Build a graph from a task list, rejecting duplicates, unknown
    /// dependencies and cycles.
    ///
    /// Repeated entries inside one task's `dependencies` are collapsed,
    /// keeping the first occurrence.
    pub fn new(id: impl Into<String>, tasks: Vec<TaskNode>) -> Result<Self> {
        let id = id.into();
        let tasks: Vec<TaskNode> = tasks.into_iter().map(dedup_dependencies).collect();

        validate_tasks(&id, &tasks)?;

        let order: Vec<TaskId> = tasks.iter().map(|t| t.id.clone()).collect();

        // First pass: create nodes.
        let mut nodes: HashMap<TaskId, GraphNode> = tasks
            .into_iter()
            .map(|task| {
                (
                    task.id.clone(),
                    GraphNode {
                        task,
                        dependents: Vec::new(),
                    },
                )
            })
            .collect();

        // Second pass: populate dependents in task order.
        for task_id in &order {
            let deps = nodes
                .get(task_id)
                .map(|n| n.task.dependencies.clone())
                .unwrap_or_default();

            for dep in deps {
                if let Some(dep_node) = nodes.get_mut(&dep) {
                    dep_node.dependents.push(task_id.clone());
                }
            }
        }

        Ok(Self { id, order, nodes })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, task: &str) -> bool {
        self.nodes.contains_key(task)
    }

    pub fn get(&self, task: &str) -> Option<&TaskNode> {
        self.nodes.get(task).map(|n| &n.task)
    }

    /// All tasks in insertion order.
    pub fn tasks(&self) -> impl Iterator<Item = &TaskNode> {
        self.order.iter().filter_map(|id| self.get(id))
    }

    /// All task ids in insertion order.
    pub fn task_ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn dependencies_of(&self, task: &str) -> &[TaskId] {
        self.nodes
            .get(task)
            .map(|n| n.task.dependencies.as_slice())
            .unwrap_or(&[])
    }

    pub fn dependents_of(&self, task: &str) -> &[TaskId] {
        self.nodes
            .get(task)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Tasks without dependencies.
    pub fn roots(&self) -> impl Iterator<Item = &TaskNode> {
        self.tasks().filter(|t| t.dependencies.is_empty())
    }
}

fn dedup_dependencies(mut task: TaskNode) -> TaskNode {
    let mut seen = HashSet::new();
    task.dependencies.retain(|dep| seen.insert(dep.clone()));
    task
}
