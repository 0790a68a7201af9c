#![allow(dead_code)]

use std::time::Duration;

pub use taskdag_test_utils::builders;
pub use taskdag_test_utils::handlers;
pub use taskdag_test_utils::init_tracing;

use taskdag::engine::{Orchestrator, OrchestratorConfig};
use taskdag::types::TaskType;

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Orchestrator with default config and `handler` registered for `analysis`.
pub fn orchestrator_with<H>(handler: H) -> Orchestrator
where
    H: taskdag::exec::TaskHandler + 'static,
{
    let orchestrator = Orchestrator::new(OrchestratorConfig::default());
    orchestrator.register_handler(TaskType::ANALYSIS, handler);
    orchestrator
}
