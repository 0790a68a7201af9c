// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::dag::validate_tasks;
use crate::errors::{Result, TaskdagError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TaskdagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.task))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_tasks_fields(cfg)?;
    validate_graph(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(TaskdagError::ConfigError(
            "config must contain at least one [task.<id>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    let section = &cfg.config;

    if section.graph_id.trim().is_empty() {
        return Err(TaskdagError::ConfigError(
            "[config].graph_id must not be empty".to_string(),
        ));
    }

    if section.max_parallel_tasks == Some(0) {
        return Err(TaskdagError::ConfigError(
            "[config].max_parallel_tasks must be >= 1 (got 0)".to_string(),
        ));
    }

    if section.task_timeout_ms == Some(0) {
        return Err(TaskdagError::ConfigError(
            "[config].task_timeout_ms must be > 0".to_string(),
        ));
    }

    let budget = &section.resource_budget;
    for (dimension, value) in [
        ("memory", budget.memory),
        ("cpu", budget.cpu),
        ("gpu", budget.gpu),
        ("storage", budget.storage),
    ] {
        if value == Some(0) {
            return Err(TaskdagError::ConfigError(format!(
                "[config.resource_budget].{dimension} must be > 0 (omit it for no limit)"
            )));
        }
    }

    Ok(())
}

fn validate_tasks_fields(cfg: &RawConfigFile) -> Result<()> {
    for (id, task) in cfg.task.iter() {
        if task.task_type.trim().is_empty() {
            return Err(TaskdagError::ConfigError(format!(
                "task '{id}' must set a non-empty `type`"
            )));
        }
        if task.timeout_ms == Some(0) {
            return Err(TaskdagError::ConfigError(format!(
                "task '{id}' has `timeout_ms = 0`; omit it to use the default"
            )));
        }
    }
    Ok(())
}

/// Unknown `after` references and cycles are reported with the same errors
/// `Orchestrator::create_graph` would return.
fn validate_graph(cfg: &RawConfigFile) -> Result<()> {
    let nodes: Vec<_> = cfg
        .task
        .iter()
        .map(|(id, task)| task.to_task_node(id))
        .collect();
    validate_tasks(&cfg.config.graph_id, &nodes)
}
