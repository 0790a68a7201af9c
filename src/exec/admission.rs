// src/exec/admission.rs

//! Resource admission control.
//!
//! A [`ResourceBudget`] holds one counting semaphore per limited dimension
//! (parallel slots, memory, cpu, gpu, storage). A task is admitted once it
//! holds permits for its whole declared demand; it waits, never fails, while
//! the budget is exhausted. Permits are returned when the [`ResourceGuard`]
//! is dropped, on every exit path.
//!
//! Every acquisition takes dimensions in the same fixed order, so two tasks
//! can never each hold what the other is waiting for.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::Context;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use crate::dag::TaskNode;
use crate::errors::Result;
use crate::exec::result::ResourceUsage;
use crate::types::ResourceLimits;

const SLOTS: usize = 0;
const MEMORY: usize = 1;
const CPU: usize = 2;
const GPU: usize = 3;
const STORAGE: usize = 4;
const DIMENSIONS: usize = 5;

const NAMES: [&str; DIMENSIONS] = ["slots", "memory", "cpu", "gpu", "storage"];

struct Dimension {
    capacity: Option<u32>,
    semaphore: Option<Arc<Semaphore>>,
    in_use: AtomicU32,
    high_water: AtomicU32,
}

impl Dimension {
    fn new(capacity: Option<u32>) -> Self {
        Self {
            capacity,
            semaphore: capacity.map(|c| Arc::new(Semaphore::new(c as usize))),
            in_use: AtomicU32::new(0),
            high_water: AtomicU32::new(0),
        }
    }

    fn allocate(&self, amount: u32) {
        let now = self.in_use.fetch_add(amount, Ordering::SeqCst) + amount;
        self.high_water.fetch_max(now, Ordering::SeqCst);
    }

    fn release(&self, amount: u32) {
        self.in_use.fetch_sub(amount, Ordering::SeqCst);
    }
}

/// Point-in-time view of allocation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BudgetSnapshot {
    /// Tasks currently holding an admission.
    pub slots: u32,
    pub memory: u32,
    pub cpu: u32,
    pub gpu: u32,
    pub storage: u32,
}

impl BudgetSnapshot {
    fn from_values(v: [u32; DIMENSIONS]) -> Self {
        Self {
            slots: v[SLOTS],
            memory: v[MEMORY],
            cpu: v[CPU],
            gpu: v[GPU],
            storage: v[STORAGE],
        }
    }
}

/// Shared admission budget for one graph execution.
pub struct ResourceBudget {
    dims: [Dimension; DIMENSIONS],
}

impl fmt::Debug for ResourceBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceBudget")
            .field("capacity", &self.capacities())
            .field("in_use", &self.in_use())
            .finish()
    }
}

impl ResourceBudget {
    /// Budget limited by `limits` and, if given, `max_parallel_tasks`
    /// concurrently admitted tasks (at least one).
    pub fn new(limits: ResourceLimits, max_parallel_tasks: Option<usize>) -> Self {
        let slots = max_parallel_tasks.map(|n| u32::try_from(n.max(1)).unwrap_or(u32::MAX));
        Self {
            dims: [
                Dimension::new(slots),
                Dimension::new(limits.memory),
                Dimension::new(limits.cpu),
                Dimension::new(limits.gpu),
                Dimension::new(limits.storage),
            ],
        }
    }

    /// Budget that admits everything immediately but still keeps counters.
    pub fn unbounded() -> Self {
        Self::new(ResourceLimits::default(), None)
    }

    pub fn capacities(&self) -> [Option<u32>; DIMENSIONS] {
        [
            self.dims[SLOTS].capacity,
            self.dims[MEMORY].capacity,
            self.dims[CPU].capacity,
            self.dims[GPU].capacity,
            self.dims[STORAGE].capacity,
        ]
    }

    pub fn in_use(&self) -> BudgetSnapshot {
        BudgetSnapshot::from_values(self.dims.each_ref().map(|d| d.in_use.load(Ordering::SeqCst)))
    }

    /// Highest simultaneous allocation seen per dimension.
    pub fn high_water(&self) -> BudgetSnapshot {
        BudgetSnapshot::from_values(
            self.dims
                .each_ref()
                .map(|d| d.high_water.load(Ordering::SeqCst)),
        )
    }

    /// Wait until the task's declared demand fits, then hold it.
    ///
    /// A demand above a dimension's capacity is clamped to the capacity, so
    /// the task runs once it has that dimension to itself.
    pub async fn admit(self: &Arc<Self>, task: &TaskNode) -> Result<ResourceGuard> {
        let r = &task.required_resources;
        let demand: [u32; DIMENSIONS] = [
            1,
            r.memory,
            r.cpu,
            u32::from(r.gpu),
            r.storage.unwrap_or(0),
        ];

        // Built up as permits arrive; if this future is dropped mid-wait the
        // partial guard gives back what it already holds.
        let mut guard = ResourceGuard {
            budget: Arc::clone(self),
            granted: [0u32; DIMENSIONS],
            permits: Vec::new(),
        };

        for (index, dim) in self.dims.iter().enumerate() {
            let mut amount = demand[index];

            if let (Some(capacity), Some(semaphore)) = (dim.capacity, dim.semaphore.as_ref()) {
                if amount > capacity {
                    warn!(
                        task = %task.id,
                        resource = NAMES[index],
                        demand = amount,
                        capacity,
                        "demand exceeds budget; clamping to capacity"
                    );
                    amount = capacity;
                }
                if amount > 0 {
                    let permit = Arc::clone(semaphore)
                        .acquire_many_owned(amount)
                        .await
                        .with_context(|| format!("admission semaphore for {} closed", NAMES[index]))?;
                    guard.permits.push(permit);
                }
            }

            dim.allocate(amount);
            guard.granted[index] = amount;
        }

        debug!(task = %task.id, granted = ?guard.granted, "resources allocated");

        Ok(guard)
    }
}

/// Admission held by one running attempt.
///
/// Dropping the guard releases both the counters and the permits.
pub struct ResourceGuard {
    budget: Arc<ResourceBudget>,
    granted: [u32; DIMENSIONS],
    permits: Vec<OwnedSemaphorePermit>,
}

impl ResourceGuard {
    pub fn usage(&self) -> ResourceUsage {
        ResourceUsage {
            memory: self.granted[MEMORY],
            cpu: self.granted[CPU],
            gpu: self.granted[GPU],
            storage: self.granted[STORAGE],
        }
    }
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        for (dim, amount) in self.budget.dims.iter().zip(self.granted) {
            dim.release(amount);
        }
        self.permits.clear();
    }
}
