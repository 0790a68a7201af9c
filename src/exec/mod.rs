// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`handler`] defines the `TaskHandler` trait and the registry that maps
//!   task types to handlers.
//! - [`task_runner`] runs one task through its retry sequence.
//! - [`batch`] runs one batch of tasks concurrently.
//! - [`retry`] computes backoff delays.
//! - [`admission`] gates concurrently allocated resources.
//! - [`result`] holds the per-task result record.
//! - [`shell`] is a built-in handler that runs shell commands.

pub mod admission;
pub mod batch;
pub mod handler;
pub mod result;
pub mod retry;
pub mod shell;
pub mod task_runner;

pub use admission::{BudgetSnapshot, ResourceBudget, ResourceGuard};
pub use batch::{BoundTask, run_batch};
pub use handler::{
    FnHandler, HandlerFuture, HandlerRegistry, HandlerResult, TaskContext, TaskHandler, handler_fn,
};
pub use result::{ExecutionResult, ExecutionStatus, ResourceUsage};
pub use retry::backoff_delay;
pub use shell::ShellHandler;
pub use task_runner::execute_task;
