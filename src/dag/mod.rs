// src/dag/mod.rs

//! Task graph representation and validation.
//!
//! - [`task`] defines a single unit of work and its declared needs.
//! - [`graph`] holds one validated, immutable graph of tasks.
//! - [`validate`] rejects duplicate ids, unknown dependencies and cycles.
//! - [`store`] keeps named graphs for an orchestrator instance.

pub mod graph;
pub mod store;
pub mod task;
pub mod validate;

pub use graph::TaskGraph;
pub use store::GraphStore;
pub use task::{Metadata, RequiredResources, RetryConfig, TaskId, TaskNode};
pub use validate::{validate_dag, validate_tasks};
