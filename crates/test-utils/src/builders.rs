#![allow(dead_code)]

use std::time::Duration;

use taskdag::dag::TaskNode;
use taskdag::types::{BackoffStrategy, TaskType};

/// Builder for `TaskNode` to simplify test setup.
pub struct TaskNodeBuilder {
    task: TaskNode,
}

impl TaskNodeBuilder {
    pub fn new(id: &str, task_type: &str) -> Self {
        Self {
            task: TaskNode::new(id, task_type),
        }
    }

    /// A task of type `analysis`.
    pub fn analysis(id: &str) -> Self {
        Self::new(id, TaskType::ANALYSIS)
    }

    pub fn name(mut self, name: &str) -> Self {
        self.task.name = name.to_string();
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.dependencies.push(dep.to_string());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.task.priority = priority;
        self
    }

    pub fn duration_ms(mut self, ms: u64) -> Self {
        self.task.estimated_duration = Duration::from_millis(ms);
        self
    }

    pub fn memory(mut self, mb: u32) -> Self {
        self.task.required_resources.memory = mb;
        self
    }

    pub fn cpu(mut self, cores: u32) -> Self {
        self.task.required_resources.cpu = cores;
        self
    }

    pub fn gpu(mut self, gpu: bool) -> Self {
        self.task.required_resources.gpu = gpu;
        self
    }

    pub fn storage(mut self, mb: u32) -> Self {
        self.task.required_resources.storage = Some(mb);
        self
    }

    pub fn retries(mut self, max_retries: u32, strategy: BackoffStrategy, initial_delay_ms: u64) -> Self {
        self.task.retry_config.max_retries = max_retries;
        self.task.retry_config.backoff_strategy = strategy;
        self.task.retry_config.initial_delay = Duration::from_millis(initial_delay_ms);
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.task.timeout = Some(Duration::from_millis(ms));
        self
    }

    pub fn metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.task.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn build(self) -> TaskNode {
        self.task
    }
}

/// `analysis` task with the given dependencies and planning estimate.
pub fn task(id: &str, deps: &[&str], duration_ms: u64) -> TaskNode {
    deps.iter()
        .fold(TaskNodeBuilder::analysis(id), |b, dep| b.after(dep))
        .duration_ms(duration_ms)
        .build()
}

/// A -> {B, C} -> D with durations A=10, B=20, C=5, D=5.
///
/// Critical path is `[A, B, D]` (35ms).
pub fn diamond() -> Vec<TaskNode> {
    vec![
        task("A", &[], 10),
        task("B", &["A"], 20),
        task("C", &["A"], 5),
        task("D", &["B", "C"], 5),
    ]
}

/// Linear chain `ids[0] -> ids[1] -> ...`, each with the same estimate.
pub fn chain(ids: &[&str], duration_ms: u64) -> Vec<TaskNode> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| {
            let deps: Vec<&str> = if i == 0 { vec![] } else { vec![ids[i - 1]] };
            task(id, &deps, duration_ms)
        })
        .collect()
}

/// Batches `[[A], [B, X], [C]]` where the critical path is `A -> B -> C`
/// and `X` (after A) is a short side branch.
pub fn chain_with_side_branch() -> Vec<TaskNode> {
    vec![
        task("A", &[], 10),
        task("B", &["A"], 50),
        task("X", &["A"], 5),
        task("C", &["B"], 10),
    ]
}
