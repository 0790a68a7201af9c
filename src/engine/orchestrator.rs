// src/engine/orchestrator.rs

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dag::{GraphStore, TaskGraph, TaskNode};
use crate::engine::history::{ExecutionHistory, RunRecord};
use crate::engine::runner::{ExecutionReport, RunOptions, RunSettings, run_plan};
use crate::engine::stats::{StatsReport, default_group_key, summarize};
use crate::engine::EventSink;
use crate::errors::{Result, TaskdagError};
use crate::exec::{
    ExecutionResult, HandlerRegistry, HandlerResult, ResourceBudget, TaskContext, TaskHandler,
    execute_task, handler_fn,
};
use crate::plan::{DEFAULT_CHECKPOINT_THRESHOLD, ExecutionPlan, PlanConstraints, PlannerOptions, plan_execution};
use crate::types::{DependencyFailurePolicy, ResourceLimits};

/// Instance-wide defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrchestratorConfig {
    /// Per-attempt timeout for tasks that do not set their own.
    pub default_task_timeout: Option<Duration>,
    /// Used when a plan's constraints do not set `max_parallel_tasks`.
    pub max_parallel_tasks: Option<usize>,
    /// Used when a plan's constraints do not set `resource_limits`.
    pub resource_budget: ResourceLimits,
    pub checkpoint_threshold: Duration,
    pub dependency_policy: DependencyFailurePolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_task_timeout: None,
            max_parallel_tasks: None,
            resource_budget: ResourceLimits::default(),
            checkpoint_threshold: DEFAULT_CHECKPOINT_THRESHOLD,
            dependency_policy: DependencyFailurePolicy::Continue,
        }
    }
}

/// Owns graphs, handlers and execution history for one independent
/// orchestration context.
///
/// All methods take `&self`; share an instance with `Arc` if several tasks
/// need it. Locks are never held across an `.await`.
#[derive(Debug, Default)]
pub struct Orchestrator {
    config: OrchestratorConfig,
    graphs: RwLock<GraphStore>,
    handlers: RwLock<HandlerRegistry>,
    history: Mutex<ExecutionHistory>,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Register `handler` for `task_type`, replacing any previous one.
    pub fn register_handler<H>(&self, task_type: impl Into<String>, handler: H)
    where
        H: TaskHandler + 'static,
    {
        self.register_shared_handler(task_type, Arc::new(handler));
    }

    pub fn register_shared_handler(&self, task_type: impl Into<String>, handler: Arc<dyn TaskHandler>) {
        let task_type = task_type.into();
        if write(&self.handlers).register(task_type.clone(), handler).is_some() {
            info!(task_type = %task_type, "replaced task handler");
        } else {
            debug!(task_type = %task_type, "registered task handler");
        }
    }

    /// Register an async closure as the handler for `task_type`.
    pub fn register_fn<F, Fut>(&self, task_type: impl Into<String>, f: F)
    where
        F: Fn(TaskNode, TaskContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register_handler(task_type, handler_fn(f));
    }

    pub fn has_handler(&self, task_type: &str) -> bool {
        read(&self.handlers).contains(task_type)
    }

    /// Validate and store a graph. Rejected graphs are not stored.
    pub fn create_graph(&self, graph_id: &str, tasks: Vec<TaskNode>) -> Result<()> {
        write(&self.graphs).create_graph(graph_id, tasks).map(|_| ())
    }

    pub fn graph(&self, graph_id: &str) -> Option<Arc<TaskGraph>> {
        read(&self.graphs).get(graph_id)
    }

    pub fn remove_graph(&self, graph_id: &str) -> bool {
        write(&self.graphs).remove(graph_id)
    }

    pub fn graph_ids(&self) -> Vec<String> {
        read(&self.graphs).graph_ids()
    }

    pub fn plan_execution(&self, graph_id: &str, constraints: PlanConstraints) -> Result<ExecutionPlan> {
        let graph = read(&self.graphs).require(graph_id)?;
        let options = PlannerOptions {
            checkpoint_threshold: self.config.checkpoint_threshold,
        };
        plan_execution(&graph, constraints, &options)
    }

    /// Run one task outside of any plan, with an unbounded budget.
    ///
    /// A missing handler is an error; every other outcome is in the result.
    pub async fn execute_task(&self, task: &TaskNode, context: serde_json::Value) -> Result<ExecutionResult> {
        let handler = read(&self.handlers).require(task.task_type.as_str())?;
        let ctx = TaskContext::new(context, CancellationToken::new());
        let budget = Arc::new(ResourceBudget::unbounded());

        Ok(execute_task(
            task,
            handler.as_ref(),
            &ctx,
            &budget,
            self.config.default_task_timeout,
            &EventSink::disabled(),
        )
        .await)
    }

    /// Execute `plan` against graph `graph_id` with default options.
    pub async fn execute_graph(
        &self,
        graph_id: &str,
        plan: &ExecutionPlan,
        context: Option<serde_json::Value>,
    ) -> Result<ExecutionReport> {
        let options = RunOptions::default().with_context(context.unwrap_or_default());
        self.execute_graph_with(graph_id, plan, options).await
    }

    /// Execute `plan` batch by batch and record the results in history.
    ///
    /// Fails before launching anything if the graph is unknown, the plan was
    /// built for another graph, or a task type has no handler.
    pub async fn execute_graph_with(
        &self,
        graph_id: &str,
        plan: &ExecutionPlan,
        options: RunOptions,
    ) -> Result<ExecutionReport> {
        let graph = read(&self.graphs).require(graph_id)?;

        if plan.graph_id != graph_id {
            return Err(TaskdagError::PlanMismatch {
                plan_id: plan.id.clone(),
                plan_graph: plan.graph_id.clone(),
                graph_id: graph_id.to_string(),
            });
        }

        let stale: Vec<&str> = plan
            .tasks()
            .filter(|t| !graph.contains(&t.id))
            .map(|t| t.id.as_str())
            .collect();
        if !stale.is_empty() {
            warn!(
                graph_id,
                plan_id = %plan.id,
                ?stale,
                "plan contains tasks no longer in the stored graph"
            );
        }

        let handlers = self.resolve_handlers(plan)?;
        let settings = self.run_settings(plan, &options);

        let report = run_plan(plan, &handlers, options, settings).await;

        lock(&self.history).append(RunRecord::from(&report));
        Ok(report)
    }

    fn resolve_handlers(&self, plan: &ExecutionPlan) -> Result<HashMap<String, Arc<dyn TaskHandler>>> {
        let registry = read(&self.handlers);
        let mut handlers = HashMap::new();
        for task in plan.tasks() {
            let task_type = task.task_type.as_str();
            if !handlers.contains_key(task_type) {
                handlers.insert(task_type.to_string(), registry.require(task_type)?);
            }
        }
        Ok(handlers)
    }

    fn run_settings(&self, plan: &ExecutionPlan, options: &RunOptions) -> RunSettings {
        let limits = plan
            .constraints
            .resource_limits
            .unwrap_or(self.config.resource_budget);
        let max_parallel = plan
            .constraints
            .max_parallel_tasks
            .or(self.config.max_parallel_tasks);

        RunSettings {
            default_timeout: self.config.default_task_timeout,
            budget: Arc::new(ResourceBudget::new(limits, max_parallel)),
            policy: options
                .dependency_policy
                .unwrap_or(self.config.dependency_policy),
        }
    }

    /// Stats over all history, or one graph's history, grouped by
    /// [`default_group_key`].
    pub fn get_stats(&self, graph_id: Option<&str>) -> StatsReport {
        self.get_stats_by(graph_id, default_group_key)
    }

    /// Stats grouped by a caller-chosen key derived from the task id.
    pub fn get_stats_by<K>(&self, graph_id: Option<&str>, key_of: K) -> StatsReport
    where
        K: Fn(&str) -> String,
    {
        let history = lock(&self.history);
        summarize(history.results(graph_id), key_of)
    }

    /// Every recorded run of `plan_id`, oldest first.
    pub fn plan_runs(&self, plan_id: &str) -> Vec<RunRecord> {
        lock(&self.history).runs_for_plan(plan_id).to_vec()
    }

    /// Number of recorded graph executions.
    pub fn history_len(&self) -> usize {
        lock(&self.history).len()
    }

    pub fn clear_history(&self) {
        lock(&self.history).clear();
    }
}

// A panic while holding one of these locks cannot leave the guarded maps
// half-updated, so poisoning is ignored.

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}
