// src/engine/history.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::engine::PlanStatus;
use crate::engine::runner::ExecutionReport;
use crate::exec::ExecutionResult;

/// One finished graph execution.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub plan_id: String,
    pub graph_id: String,
    pub status: PlanStatus,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<ExecutionResult>,
}

impl From<&ExecutionReport> for RunRecord {
    fn from(report: &ExecutionReport) -> Self {
        let mut results: Vec<ExecutionResult> = report.results.values().cloned().collect();
        results.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.task_id.cmp(&b.task_id)));
        Self {
            plan_id: report.plan_id.clone(),
            graph_id: report.graph_id.clone(),
            status: report.status.clone(),
            finished_at: report.finished_at,
            results,
        }
    }
}

/// In-memory execution history keyed by plan id.
///
/// Executing the same plan more than once appends another record under the
/// same key.
#[derive(Debug, Default)]
pub struct ExecutionHistory {
    runs: HashMap<String, Vec<RunRecord>>,
}

impl ExecutionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: RunRecord) {
        self.runs
            .entry(record.plan_id.clone())
            .or_default()
            .push(record);
    }

    pub fn runs_for_plan(&self, plan_id: &str) -> &[RunRecord] {
        self.runs.get(plan_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All records, optionally restricted to one graph.
    pub fn runs(&self, graph_id: Option<&str>) -> impl Iterator<Item = &RunRecord> {
        self.runs
            .values()
            .flatten()
            .filter(move |r| graph_id.is_none_or(|g| r.graph_id == g))
    }

    /// All task results, optionally restricted to one graph.
    pub fn results(&self, graph_id: Option<&str>) -> impl Iterator<Item = &ExecutionResult> {
        self.runs(graph_id).flat_map(|r| r.results.iter())
    }

    /// Number of recorded runs.
    pub fn len(&self) -> usize {
        self.runs.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn clear(&mut self) {
        self.runs.clear();
    }
}
