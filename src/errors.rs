// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Only structural and configuration problems are errors. Task-level
//! failures are reported as data in [`crate::exec::ExecutionResult`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Graph not found: {0}")]
    GraphNotFound(String),

    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    #[error("Duplicate task '{task}' in graph '{graph_id}'")]
    DuplicateTask { graph_id: String, task: String },

    #[error("Task '{task}' in graph '{graph_id}' has unknown dependency '{dependency}'")]
    UnknownDependency {
        graph_id: String,
        task: String,
        dependency: String,
    },

    #[error(
        "Cycle detected in graph '{graph_id}': task '{task}' depends on '{dependency}', which is already on the dependency path"
    )]
    DagCycle {
        graph_id: String,
        task: String,
        dependency: String,
    },

    #[error("Planner deadlock in graph '{graph_id}': no eligible batch for {unplaced:?}")]
    PlannerDeadlock {
        graph_id: String,
        unplaced: Vec<String>,
    },

    #[error("No handler registered for task type '{0}'")]
    HandlerNotFound(String),

    #[error("Plan '{plan_id}' was built for graph '{plan_graph}', not '{graph_id}'")]
    PlanMismatch {
        plan_id: String,
        plan_graph: String,
        graph_id: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskdagError {
    /// Whether this error means the graph was rejected at creation time.
    pub fn is_graph_invalid(&self) -> bool {
        matches!(
            self,
            TaskdagError::InvalidGraph(_)
                | TaskdagError::DuplicateTask { .. }
                | TaskdagError::UnknownDependency { .. }
                | TaskdagError::DagCycle { .. }
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskdagError>;
