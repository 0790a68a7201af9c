// src/plan/resources.rs

use crate::dag::TaskNode;
use crate::plan::model::{ResourceAverage, ResourcePeak, ResourceRequirements};

/// Peak and average declared demand over all tasks.
///
/// Peak takes the per-dimension maximum of any single task, except GPU,
/// which counts the tasks that need one. Average is the per-dimension mean;
/// for GPU that is the fraction of GPU tasks.
pub fn estimate_resources(tasks: &[TaskNode]) -> ResourceRequirements {
    if tasks.is_empty() {
        return ResourceRequirements::default();
    }

    let mut peak = ResourcePeak::default();
    let mut sums = (0u64, 0u64, 0u64, 0u64);

    for task in tasks {
        let r = &task.required_resources;
        let storage = r.storage.unwrap_or(0);

        peak.memory = peak.memory.max(r.memory);
        peak.cpu = peak.cpu.max(r.cpu);
        peak.storage = peak.storage.max(storage);
        if r.gpu {
            peak.gpu += 1;
        }

        sums.0 += u64::from(r.memory);
        sums.1 += u64::from(r.cpu);
        sums.2 += u64::from(r.gpu);
        sums.3 += u64::from(storage);
    }

    let n = tasks.len() as f64;
    let average = ResourceAverage {
        memory: sums.0 as f64 / n,
        cpu: sums.1 as f64 / n,
        gpu: sums.2 as f64 / n,
        storage: sums.3 as f64 / n,
    };

    ResourceRequirements { peak, average }
}
