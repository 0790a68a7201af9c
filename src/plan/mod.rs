// src/plan/mod.rs

//! Execution planning.
//!
//! - [`planner`] splits a graph into ordered parallel batches.
//! - [`critical_path`] finds the longest cumulative-duration chain.
//! - [`resources`] estimates peak and average resource demand.
//! - [`advice`] produces advisory optimization notes.
//! - [`model`] holds the plan types.

pub mod advice;
pub mod critical_path;
pub mod model;
pub mod planner;
pub mod resources;

pub use critical_path::critical_path;
pub use model::{ExecutionPlan, PlanConstraints, ResourceAverage, ResourcePeak, ResourceRequirements};
pub use planner::{
    DEFAULT_CHECKPOINT_THRESHOLD, PlannerOptions, partition_batches, plan_execution,
    total_estimated_time,
};
pub use resources::estimate_resources;
