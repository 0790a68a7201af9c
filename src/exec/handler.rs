// src/exec/handler.rs

//! Pluggable task handlers.
//!
//! The orchestrator performs no business logic itself. Each task type is
//! served by a [`TaskHandler`] registered in a [`HandlerRegistry`]; the
//! surrounding application supplies them (AI clients, data pipelines, ...).
//! Tests register deterministic fakes instead.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::dag::TaskNode;
use crate::errors::{Result, TaskdagError};

/// What a handler returns: a JSON result, or an error that counts as a
/// failed attempt.
pub type HandlerResult = anyhow::Result<serde_json::Value>;

pub type HandlerFuture<'a> = BoxFuture<'a, HandlerResult>;

/// Per-attempt context handed to a handler.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub graph_id: Option<String>,
    pub plan_id: Option<String>,
    /// 1-based attempt number.
    pub attempt: u32,
    /// Caller-supplied context value.
    pub value: Arc<serde_json::Value>,
    /// Cancelled when the run is stopped; long-running handlers should
    /// watch it.
    pub cancel: CancellationToken,
}

impl TaskContext {
    pub fn new(value: serde_json::Value, cancel: CancellationToken) -> Self {
        Self {
            graph_id: None,
            plan_id: None,
            attempt: 1,
            value: Arc::new(value),
            cancel,
        }
    }

    pub fn for_run(mut self, graph_id: &str, plan_id: &str) -> Self {
        self.graph_id = Some(graph_id.to_string());
        self.plan_id = Some(plan_id.to_string());
        self
    }

    pub fn for_attempt(&self, attempt: u32) -> Self {
        Self {
            attempt,
            ..self.clone()
        }
    }
}

/// Executes tasks of one type.
pub trait TaskHandler: Send + Sync {
    fn handle<'a>(&'a self, task: &'a TaskNode, ctx: &'a TaskContext) -> HandlerFuture<'a>;
}

/// Adapter turning an async closure into a [`TaskHandler`].
///
/// The closure receives owned clones so the returned future can be `'static`.
pub struct FnHandler<F> {
    f: F,
}

pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(TaskNode, TaskContext) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    FnHandler { f }
}

impl<F, Fut> TaskHandler for FnHandler<F>
where
    F: Fn(TaskNode, TaskContext) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn handle<'a>(&'a self, task: &'a TaskNode, ctx: &'a TaskContext) -> HandlerFuture<'a> {
        Box::pin((self.f)(task.clone(), ctx.clone()))
    }
}

/// Task type -> handler map.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("types", &self.types())
            .finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `task_type`, returning the handler it replaced.
    pub fn register(
        &mut self,
        task_type: impl Into<String>,
        handler: Arc<dyn TaskHandler>,
    ) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.insert(task_type.into(), handler)
    }

    pub fn get(&self, task_type: &str) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.get(task_type).cloned()
    }

    /// Like [`get`](Self::get) but a missing handler is an error.
    pub fn require(&self, task_type: &str) -> Result<Arc<dyn TaskHandler>> {
        self.get(task_type)
            .ok_or_else(|| TaskdagError::HandlerNotFound(task_type.to_string()))
    }

    pub fn contains(&self, task_type: &str) -> bool {
        self.handlers.contains_key(task_type)
    }

    /// Registered task types, sorted.
    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.handlers.keys().map(|s| s.as_str()).collect();
        types.sort_unstable();
        types
    }
}
