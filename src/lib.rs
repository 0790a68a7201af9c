// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod plan;
pub mod types;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::engine::{ExecutionReport, Orchestrator, RunOptions, StatsReport};
use crate::exec::ShellHandler;
use crate::plan::ExecutionPlan;
use crate::types::TaskType;

pub use crate::engine::OrchestratorConfig;
pub use crate::errors::TaskdagError;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - orchestrator + shell handlers for the default task types
/// - planning (and the dry-run exit)
/// - graph execution with Ctrl-C cancellation
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let graph_id = args
        .graph_id
        .clone()
        .unwrap_or_else(|| cfg.graph_id().to_string());

    let orchestrator = Orchestrator::new(cfg.orchestrator_config());
    for task_type in TaskType::DEFAULTS {
        orchestrator.register_handler(task_type, ShellHandler::new());
    }

    orchestrator.create_graph(&graph_id, cfg.task_nodes())?;
    let plan = orchestrator.plan_execution(&graph_id, cfg.plan_constraints())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&plan);
    }

    if args.dry_run {
        debug!("dry-run complete (no execution)");
        return Ok(());
    }

    // Ctrl-C → cooperative cancellation.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            warn!("Ctrl+C received; cancelling run");
            cancel.cancel();
        });
    }

    let report = orchestrator
        .execute_graph_with(&graph_id, &plan, RunOptions::default().with_cancel(cancel))
        .await?;
    let stats = orchestrator.get_stats(Some(&graph_id));

    if args.json {
        let out = RunOutput {
            report: &report,
            stats: &stats,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_report(&plan, &report);
        print_stats(&stats);
    }

    info!(graph_id = %graph_id, status = ?report.status, "run finished");

    if !report.all_succeeded() {
        bail!(
            "graph '{}' did not complete successfully ({:?})",
            graph_id,
            report.status
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct RunOutput<'a> {
    report: &'a ExecutionReport,
    stats: &'a StatsReport,
}

fn print_plan(plan: &ExecutionPlan) {
    println!("taskdag plan {} (graph '{}')", plan.id, plan.graph_id);
    println!(
        "  estimated total time: {:?}",
        plan.total_estimated_time
    );
    println!(
        "  critical path: {} ({:?})",
        plan.critical_path.join(" -> "),
        plan.critical_path_duration
    );
    let peak = plan.resource_requirements.peak;
    println!(
        "  peak resources: memory={} cpu={} gpu={} storage={}",
        peak.memory, peak.cpu, peak.gpu, peak.storage
    );
    println!();

    println!("batches ({}):", plan.parallel_groups.len());
    for (index, ids) in plan.batch_ids().iter().enumerate() {
        println!("  {index}: {}", ids.join(", "));
    }

    if !plan.optimizations.is_empty() {
        println!();
        println!("notes:");
        for note in &plan.optimizations {
            println!("  - {note}");
        }
    }
    println!();
}

fn print_report(plan: &ExecutionPlan, report: &ExecutionReport) {
    println!("run {:?} after {:?}", report.status, report.duration);
    for task in plan.tasks() {
        match report.result(&task.id) {
            Some(r) => {
                println!(
                    "  {:<24} {:<9} attempts={} {:?}",
                    r.task_id,
                    format!("{:?}", r.status).to_lowercase(),
                    r.attempts,
                    r.duration
                );
                if let Some(err) = &r.error {
                    println!("      error: {err}");
                }
            }
            None if report.skipped.contains(&task.id) => {
                println!("  {:<24} skipped", task.id);
            }
            None => println!("  {:<24} not attempted", task.id),
        }
    }
    println!();
}

fn print_stats(stats: &StatsReport) {
    match stats {
        StatsReport::NoHistory { message } => println!("stats: {message}"),
        StatsReport::Summary(s) => {
            println!(
                "stats: {} executions, success rate {:.0}%, average {:?}",
                s.total_executions,
                s.success_rate * 100.0,
                s.average_duration
            );
            for (group, g) in &s.by_group {
                println!(
                    "  {group:<24} {}/{} ok, average {:?}",
                    g.successes, g.count, g.average_duration
                );
            }
        }
    }
}
