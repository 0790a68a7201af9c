// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::dag::{Metadata, RequiredResources, RetryConfig, TaskNode};
use crate::engine::OrchestratorConfig;
use crate::plan::{DEFAULT_CHECKPOINT_THRESHOLD, PlanConstraints};
use crate::types::{BackoffStrategy, DependencyFailurePolicy, ResourceLimits, TaskType};

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// graph_id = "nightly"
/// max_parallel_tasks = 4
///
/// [config.resource_budget]
/// memory = 4096
///
/// [task.fetch]
/// type = "data_processing"
/// estimated_duration_ms = 1000
///
/// [task.fetch.metadata]
/// cmd = "echo fetch"
///
/// [task.report]
/// type = "synthesis"
/// after = ["fetch"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// All tasks from `[task.<id>]`, keyed by task id.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// A validated configuration. Built with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub task: BTreeMap<String, TaskConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    #[serde(default = "default_graph_id")]
    pub graph_id: String,

    /// Concurrency cap for one run. Unlimited when absent.
    #[serde(default)]
    pub max_parallel_tasks: Option<usize>,

    /// Only used for planning advice.
    #[serde(default)]
    pub max_execution_time_ms: Option<u64>,

    /// Per-attempt timeout for tasks that do not set `timeout_ms`.
    #[serde(default)]
    pub task_timeout_ms: Option<u64>,

    #[serde(default = "default_checkpoint_threshold_ms")]
    pub checkpoint_threshold_ms: u64,

    #[serde(default)]
    pub dependency_policy: DependencyFailurePolicy,

    #[serde(default)]
    pub resource_budget: ResourceLimits,
}

fn default_graph_id() -> String {
    "default".to_string()
}

fn default_checkpoint_threshold_ms() -> u64 {
    DEFAULT_CHECKPOINT_THRESHOLD.as_millis() as u64
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            graph_id: default_graph_id(),
            max_parallel_tasks: None,
            max_execution_time_ms: None,
            task_timeout_ms: None,
            checkpoint_threshold_ms: default_checkpoint_threshold_ms(),
            dependency_policy: DependencyFailurePolicy::default(),
            resource_budget: ResourceLimits::default(),
        }
    }
}

/// `[task.<id>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Display name; defaults to the task id.
    #[serde(default)]
    pub name: Option<String>,

    /// Handler key, e.g. `"ai_request"`.
    #[serde(rename = "type")]
    pub task_type: String,

    /// Ids of tasks that must finish first.
    #[serde(default)]
    pub after: Vec<String>,

    #[serde(default)]
    pub priority: i32,

    #[serde(default)]
    pub estimated_duration_ms: u64,

    #[serde(default)]
    pub timeout_ms: Option<u64>,

    #[serde(default)]
    pub resources: ResourcesConfig,

    #[serde(default)]
    pub retry: RetrySection,

    /// Passed to the handler untouched. The shell handler reads `cmd`.
    #[serde(default)]
    pub metadata: Metadata,
}

/// `[task.<id>.resources]` section.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ResourcesConfig {
    #[serde(default)]
    pub memory: u32,
    #[serde(default)]
    pub cpu: u32,
    #[serde(default)]
    pub gpu: bool,
    #[serde(default)]
    pub storage: Option<u32>,
}

/// `[task.<id>.retry]` section.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RetrySection {
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default)]
    pub backoff: BackoffStrategy,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
}

fn default_initial_delay_ms() -> u64 {
    100
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff: BackoffStrategy::default(),
            initial_delay_ms: default_initial_delay_ms(),
        }
    }
}

impl ConfigFile {
    /// Construct without validation. Prefer `ConfigFile::try_from(raw)`.
    pub(crate) fn new_unchecked(config: ConfigSection, task: BTreeMap<String, TaskConfig>) -> Self {
        Self { config, task }
    }

    pub fn graph_id(&self) -> &str {
        &self.config.graph_id
    }

    /// Tasks in id order, ready for `Orchestrator::create_graph`.
    pub fn task_nodes(&self) -> Vec<TaskNode> {
        self.task.iter().map(|(id, t)| t.to_task_node(id)).collect()
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            default_task_timeout: self.config.task_timeout_ms.map(Duration::from_millis),
            max_parallel_tasks: self.config.max_parallel_tasks,
            resource_budget: self.config.resource_budget,
            checkpoint_threshold: Duration::from_millis(self.config.checkpoint_threshold_ms),
            dependency_policy: self.config.dependency_policy,
        }
    }

    pub fn plan_constraints(&self) -> PlanConstraints {
        let budget = self.config.resource_budget;
        PlanConstraints {
            max_parallel_tasks: self.config.max_parallel_tasks,
            max_execution_time: self.config.max_execution_time_ms.map(Duration::from_millis),
            resource_limits: (!budget.is_unbounded()).then_some(budget),
        }
    }
}

impl TaskConfig {
    pub fn to_task_node(&self, id: &str) -> TaskNode {
        let mut node = TaskNode::new(id, TaskType::new(self.task_type.trim()));
        if let Some(name) = &self.name {
            node.name = name.clone();
        }
        node.dependencies = self.after.clone();
        node.priority = self.priority;
        node.estimated_duration = Duration::from_millis(self.estimated_duration_ms);
        node.timeout = self.timeout_ms.map(Duration::from_millis);
        node.required_resources = RequiredResources {
            memory: self.resources.memory,
            cpu: self.resources.cpu,
            gpu: self.resources.gpu,
            storage: self.resources.storage,
        };
        node.retry_config = RetryConfig {
            max_retries: self.retry.max_retries,
            backoff_strategy: self.retry.backoff,
            initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
        };
        node.metadata = self.metadata.clone();
        node
    }
}
