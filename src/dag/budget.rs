// src/dag/budget.rs

//! Global resource budget for one run.

use tracing::debug;

use crate::config::RunConfig;
use crate::types::Resources;

/// Cores, memory and worker slots available to concurrently running jobs.
///
/// Owned by the scheduling loop, which is the only place that reserves and
/// releases; workers never touch it.
#[derive(Debug, Clone)]
pub struct ResourceBudget {
    max_cores: u32,
    max_memory: u64,
    max_workers: usize,
    used_cores: u32,
    used_memory: u64,
    active: usize,
}

impl ResourceBudget {
    pub fn new(max_cores: u32, max_memory: u64, max_workers: usize) -> Self {
        Self {
            max_cores,
            max_memory,
            max_workers: max_workers.max(1),
            used_cores: 0,
            used_memory: 0,
            active: 0,
        }
    }

    pub fn from_config(cfg: &RunConfig) -> Self {
        Self::new(cfg.max_cores, cfg.max_memory.bytes(), cfg.max_workers)
    }

    /// Whether `req` fits into an otherwise idle budget.
    pub fn can_ever_fit(&self, req: &Resources) -> bool {
        req.cores <= self.max_cores && req.memory.bytes() <= self.max_memory
    }

    /// Reserve `req` if it fits in what is left right now.
    pub fn try_reserve(&mut self, req: &Resources) -> bool {
        let fits = self.active < self.max_workers
            && self
                .used_cores
                .checked_add(req.cores)
                .is_some_and(|n| n <= self.max_cores)
            && self
                .used_memory
                .checked_add(req.memory.bytes())
                .is_some_and(|n| n <= self.max_memory);

        if fits {
            self.used_cores += req.cores;
            self.used_memory += req.memory.bytes();
            self.active += 1;
            debug!(
                used_cores = self.used_cores,
                used_memory = self.used_memory,
                active = self.active,
                "reserved resources"
            );
        }
        fits
    }

    pub fn release(&mut self, req: &Resources) {
        self.used_cores = self.used_cores.saturating_sub(req.cores);
        self.used_memory = self.used_memory.saturating_sub(req.memory.bytes());
        self.active = self.active.saturating_sub(1);
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn max_cores(&self) -> u32 {
        self.max_cores
    }

    pub fn max_memory(&self) -> u64 {
        self.max_memory
    }
}

