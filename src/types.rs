// src/types.rs

//! Small shared value types used by config, planner and executor.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Task type used to look up a handler in the registry.
///
/// The set is open: any string can be registered. The five built-in names
/// are listed in [`TaskType::DEFAULTS`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskType(String);

impl TaskType {
    pub const AI_REQUEST: &'static str = "ai_request";
    pub const DATA_PROCESSING: &'static str = "data_processing";
    pub const ANALYSIS: &'static str = "analysis";
    pub const SYNTHESIS: &'static str = "synthesis";
    pub const VALIDATION: &'static str = "validation";

    /// The default task types an application is expected to supply handlers for.
    pub const DEFAULTS: [&'static str; 5] = [
        Self::AI_REQUEST,
        Self::DATA_PROCESSING,
        Self::ANALYSIS,
        Self::SYNTHESIS,
        Self::VALIDATION,
    ];

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_ai_request(&self) -> bool {
        self.0 == Self::AI_REQUEST
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskType {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskType {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// How the delay between retry attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    Exponential,
    Linear,
    Fixed,
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        BackoffStrategy::Exponential
    }
}

impl FromStr for BackoffStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exponential" => Ok(BackoffStrategy::Exponential),
            "linear" => Ok(BackoffStrategy::Linear),
            "fixed" => Ok(BackoffStrategy::Fixed),
            other => Err(format!(
                "invalid backoff strategy: {other} (expected \"exponential\", \"linear\" or \"fixed\")"
            )),
        }
    }
}

/// What happens to a task whose dependency did not succeed.
///
/// - `Continue`: the task still runs; dependencies only order execution
///   (default behaviour).
/// - `SkipDependents`: the task is not launched and is reported as skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyFailurePolicy {
    Continue,
    SkipDependents,
}

impl Default for DependencyFailurePolicy {
    fn default() -> Self {
        DependencyFailurePolicy::Continue
    }
}

impl FromStr for DependencyFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "continue" => Ok(DependencyFailurePolicy::Continue),
            "skip_dependents" | "skip-dependents" => Ok(DependencyFailurePolicy::SkipDependents),
            other => Err(format!(
                "invalid dependency_policy: {other} (expected \"continue\" or \"skip_dependents\")"
            )),
        }
    }
}

/// Upper bounds on concurrently allocated resources.
///
/// `None` in a dimension means that dimension is not limited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    #[serde(default)]
    pub memory: Option<u32>,
    #[serde(default)]
    pub cpu: Option<u32>,
    #[serde(default)]
    pub gpu: Option<u32>,
    #[serde(default)]
    pub storage: Option<u32>,
}

impl ResourceLimits {
    pub fn is_unbounded(&self) -> bool {
        self.memory.is_none() && self.cpu.is_none() && self.gpu.is_none() && self.storage.is_none()
    }
}
