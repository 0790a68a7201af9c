// src/exec/shell.rs

//! Handler that runs a shell command taken from task metadata.

use std::process::Stdio;

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use tokio::process::Command;
use tracing::{debug, info};

use crate::dag::TaskNode;
use crate::exec::handler::{HandlerFuture, TaskContext, TaskHandler};

/// Runs `metadata.<key>` (default `cmd`) through the platform shell.
///
/// - Succeeds with `{"stdout", "exit_code"}` when the process exits with
///   status 0.
/// - Any other exit is a failed attempt carrying the stderr tail.
/// - If the context is cancelled, or the attempt future is dropped because
///   of a timeout, the child process is killed.
#[derive(Debug, Clone)]
pub struct ShellHandler {
    key: String,
}

impl Default for ShellHandler {
    fn default() -> Self {
        Self {
            key: "cmd".to_string(),
        }
    }
}

impl ShellHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the command from a different metadata key.
    pub fn with_key(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl TaskHandler for ShellHandler {
    fn handle<'a>(&'a self, task: &'a TaskNode, ctx: &'a TaskContext) -> HandlerFuture<'a> {
        Box::pin(run_command(&self.key, task, ctx))
    }
}

async fn run_command(key: &str, task: &TaskNode, ctx: &TaskContext) -> Result<Value> {
    let cmd_line = task
        .metadata
        .get(key)
        .and_then(Value::as_str)
        .with_context(|| format!("task '{}' has no string `metadata.{key}`", task.id))?;

    info!(
        task = %task.id,
        attempt = ctx.attempt,
        cmd = %cmd_line,
        "starting task process"
    );

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd_line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd_line);
        c
    };

    cmd.env("TASKDAG_TASK_ID", &task.id)
        .env("TASKDAG_ATTEMPT", ctx.attempt.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd
        .spawn()
        .with_context(|| format!("spawning process for task '{}'", task.id))?;

    let output = tokio::select! {
        output = child.wait_with_output() => output
            .with_context(|| format!("waiting for process of task '{}'", task.id))?,
        _ = ctx.cancel.cancelled() => {
            // Dropping the child future kills the process (kill_on_drop).
            bail!("task '{}' cancelled; process killed", task.id);
        }
    };

    let stderr = String::from_utf8_lossy(&output.stderr);
    for line in stderr.lines() {
        debug!(task = %task.id, "stderr: {}", line);
    }

    let code = output.status.code().unwrap_or(-1);
    info!(
        task = %task.id,
        exit_code = code,
        success = output.status.success(),
        "task process exited"
    );

    if !output.status.success() {
        let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
        let tail: Vec<&str> = tail.into_iter().rev().collect();
        bail!("command exited with code {code}: {}", tail.join("\n"));
    }

    Ok(json!({
        "stdout": String::from_utf8_lossy(&output.stdout).trim_end(),
        "exit_code": code,
    }))
}
