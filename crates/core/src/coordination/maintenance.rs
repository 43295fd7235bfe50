// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic maintenance task for coordination primitives
//!
//! Prunes idle entries and, when configured, resets barrier cycles that have
//! been accumulating for too long.

use super::manager::{BarrierManager, LockManager};
use crate::clock::Clock;
use crate::effect::Effect;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for maintenance task
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    /// How often to run maintenance
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Whether to drop locks and barriers with nothing in flight
    pub prune_idle: bool,
    /// Reset barrier cycles older than this; unset means barriers wait forever
    #[serde(with = "humantime_serde")]
    pub barrier_stale_after: Option<Duration>,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            prune_idle: true,
            barrier_stale_after: None,
        }
    }
}

impl MaintenanceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_prune_idle(mut self, enabled: bool) -> Self {
        self.prune_idle = enabled;
        self
    }

    pub fn with_barrier_stale_after(mut self, after: Duration) -> Self {
        self.barrier_stale_after = Some(after);
        self
    }
}

/// Background maintenance task for coordination primitives
pub struct MaintenanceTask<C: Clock> {
    config: MaintenanceConfig,
    clock: C,
}

impl<C: Clock> MaintenanceTask<C> {
    pub fn new(config: MaintenanceConfig, clock: C) -> Self {
        Self { config, clock }
    }

    /// Run a single maintenance cycle
    ///
    /// Returns effects that should be processed (barrier reset events)
    pub fn tick(&self, locks: &mut LockManager, barriers: &mut BarrierManager) -> Vec<Effect> {
        let mut effects = Vec::new();

        if let Some(after) = self.config.barrier_stale_after {
            if let Some(cutoff) = self.clock.now().checked_sub(after) {
                for name in barriers.opened_before(cutoff) {
                    effects.extend(barriers.reset(&name, &self.clock));
                }
            }
        }

        if self.config.prune_idle {
            locks.prune_idle();
            barriers.prune_idle();
        }

        effects
    }

    /// Get the maintenance interval
    pub fn interval(&self) -> Duration {
        self.config.interval
    }
}

/// Statistics about coordination resources
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinationStats {
    pub total_locks: usize,
    pub held_locks: usize,
    pub waiting_agents: usize,
    pub active_barriers: usize,
    pub arrived_agents: usize,
}

impl CoordinationStats {
    /// Collect statistics from the managers
    pub fn collect(locks: &LockManager, barriers: &BarrierManager) -> Self {
        let mut stats = CoordinationStats::default();

        for lock in locks.locks() {
            stats.total_locks += 1;
            if !lock.is_free() {
                stats.held_locks += 1;
            }
            stats.waiting_agents += lock.queue_len();
        }

        for barrier in barriers.barriers() {
            if !barrier.is_empty() {
                stats.active_barriers += 1;
                stats.arrived_agents += barrier.arrived_count();
            }
        }

        stats
    }
}

#[cfg(test)]
#[path = "maintenance_tests.rs"]
mod tests;
