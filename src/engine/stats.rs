// src/engine/stats.rs

//! Aggregate statistics over execution history.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::exec::{ExecutionResult, ExecutionStatus};

/// Counters for one group of results.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupStats {
    pub count: usize,
    pub successes: usize,
    pub success_rate: f64,
    pub average_duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSummary {
    pub total_executions: usize,
    pub successes: usize,
    pub failures: usize,
    pub timeouts: usize,
    pub cancelled: usize,
    /// `successes / total_executions`.
    pub success_rate: f64,
    pub average_duration: Duration,
    pub by_group: BTreeMap<String, GroupStats>,
}

/// Stats answer: either a summary or an explicit "nothing recorded".
///
/// A graph with history but zero successes is a `Summary` with
/// `success_rate == 0.0`, never `NoHistory`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatsReport {
    NoHistory { message: String },
    Summary(StatsSummary),
}

impl StatsReport {
    pub fn no_history() -> Self {
        StatsReport::NoHistory {
            message: "no history".to_string(),
        }
    }

    pub fn is_no_history(&self) -> bool {
        matches!(self, StatsReport::NoHistory { .. })
    }

    pub fn summary(&self) -> Option<&StatsSummary> {
        match self {
            StatsReport::Summary(s) => Some(s),
            StatsReport::NoHistory { .. } => None,
        }
    }
}

/// Default grouping key: the task id up to the first `_`, `-`, `.` or `:`.
pub fn default_group_key(task_id: &str) -> String {
    task_id
        .split(['_', '-', '.', ':'])
        .next()
        .filter(|p| !p.is_empty())
        .unwrap_or(task_id)
        .to_string()
}

#[derive(Default)]
struct Accumulator {
    count: usize,
    successes: usize,
    total: Duration,
}

impl Accumulator {
    fn add(&mut self, r: &ExecutionResult) {
        self.count += 1;
        if r.is_success() {
            self.successes += 1;
        }
        self.total += r.duration;
    }

    fn rate(&self) -> f64 {
        self.successes as f64 / self.count as f64
    }

    fn average(&self) -> Duration {
        self.total.div_f64(self.count as f64)
    }
}

/// Summarise `results`, grouping by `key_of(task_id)`.
pub fn summarize<'a, I, K>(results: I, key_of: K) -> StatsReport
where
    I: IntoIterator<Item = &'a ExecutionResult>,
    K: Fn(&str) -> String,
{
    let mut all = Accumulator::default();
    let mut failures = 0;
    let mut timeouts = 0;
    let mut cancelled = 0;
    let mut groups: BTreeMap<String, Accumulator> = BTreeMap::new();

    for r in results {
        all.add(r);
        match r.status {
            ExecutionStatus::Success => {}
            ExecutionStatus::Failure => failures += 1,
            ExecutionStatus::Timeout => timeouts += 1,
            ExecutionStatus::Cancelled => cancelled += 1,
        }
        groups.entry(key_of(&r.task_id)).or_default().add(r);
    }

    if all.count == 0 {
        return StatsReport::no_history();
    }

    let by_group = groups
        .into_iter()
        .map(|(key, acc)| {
            (
                key,
                GroupStats {
                    count: acc.count,
                    successes: acc.successes,
                    success_rate: acc.rate(),
                    average_duration: acc.average(),
                },
            )
        })
        .collect();

    StatsReport::Summary(StatsSummary {
        total_executions: all.count,
        successes: all.successes,
        failures,
        timeouts,
        cancelled,
        success_rate: all.rate(),
        average_duration: all.average(),
        by_group,
    })
}
