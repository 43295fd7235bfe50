// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordination façade
//!
//! Validates requests, resolves the calling agent, drives the lock and
//! barrier managers and executes the effects they return. All methods take
//! `&mut self`; the owner serializes access.

use crate::api::{
    AcquireLockRequest, AcquireLockResponse, BarrierEnterRequest, BarrierEnterResponse,
    ReleaseLockRequest, ReleaseLockResponse,
};
use crate::error::CoordinationError;
use crate::scheduler::{lock_expiry_id, ScheduledKind, Scheduler};
use a2a_adapters::{NotifyAdapter, SessionResolver};
use a2a_core::{
    AgentId, BarrierManager, Clock, ConnectionId, CoordinationStats, Effect, Event, LockManager,
    MaintenanceTask, MAX_LOCK_TIMEOUT,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Defaults applied to requests that omit optional fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Lease used when an acquire carries no timeout
    #[serde(with = "humantime_serde")]
    pub default_lock_timeout: Duration,
    /// Barrier size used when the first entrant carries no expected_count
    pub default_expected_count: usize,
    /// Release held locks and leave wait queues when an agent disconnects
    pub release_on_disconnect: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            default_lock_timeout: Duration::from_secs(30),
            default_expected_count: 2,
            release_on_disconnect: true,
        }
    }
}

/// Single entry point for lock and barrier operations
pub struct Coordinator<N, S, C: Clock> {
    config: CoordinatorConfig,
    locks: LockManager,
    barriers: BarrierManager,
    scheduler: Scheduler,
    notifier: N,
    sessions: S,
    clock: C,
}

impl<N, S, C> Coordinator<N, S, C>
where
    N: NotifyAdapter,
    S: SessionResolver,
    C: Clock,
{
    pub fn new(config: CoordinatorConfig, notifier: N, sessions: S, clock: C) -> Self {
        Self {
            config,
            locks: LockManager::new(),
            barriers: BarrierManager::new(),
            scheduler: Scheduler::new(),
            notifier,
            sessions,
            clock,
        }
    }

    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    pub fn barriers(&self) -> &BarrierManager {
        &self.barriers
    }

    pub fn stats(&self) -> CoordinationStats {
        CoordinationStats::collect(&self.locks, &self.barriers)
    }

    /// Acquire a lock, or join its wait queue
    pub async fn acquire_lock(
        &mut self,
        connection: &ConnectionId,
        request: AcquireLockRequest,
    ) -> Result<AcquireLockResponse, CoordinationError> {
        let lock_id = require_id("lock_id", request.lock_id)?;
        let agent_id = self.resolve_agent(connection, request.agent_id)?;
        let timeout = match request.timeout {
            Some(seconds) => parse_timeout(seconds)?,
            None => self.config.default_lock_timeout,
        };

        let (outcome, effects) = self
            .locks
            .acquire(&lock_id, agent_id, timeout, &self.clock);
        self.execute_all(effects).await;

        Ok(AcquireLockResponse {
            lock_id,
            granted: outcome.granted,
            expires_at: outcome.expires_at.map(|at| self.clock.to_utc(at)),
            queue_position: outcome.queue_position,
        })
    }

    /// Release a lock held by the calling agent
    pub async fn release_lock(
        &mut self,
        connection: &ConnectionId,
        request: ReleaseLockRequest,
    ) -> Result<ReleaseLockResponse, CoordinationError> {
        let lock_id = require_id("lock_id", request.lock_id)?;
        let agent_id = self.resolve_agent(connection, request.agent_id)?;

        let (outcome, effects) = self.locks.release(&lock_id, agent_id, &self.clock);
        self.execute_all(effects).await;

        Ok(ReleaseLockResponse {
            lock_id,
            released: outcome.released,
            error: outcome.error.map(|e| e.to_string()),
        })
    }

    /// Enter a barrier
    pub async fn barrier_enter(
        &mut self,
        connection: &ConnectionId,
        request: BarrierEnterRequest,
    ) -> Result<BarrierEnterResponse, CoordinationError> {
        let barrier_id = require_id("barrier_id", request.barrier_id)?;
        let agent_id = self.resolve_agent(connection, request.agent_id)?;
        let expected_count = match request.expected_count {
            Some(0) => {
                return Err(CoordinationError::InvalidInput(
                    "expected_count must be at least 1".to_string(),
                ))
            }
            Some(count) => usize::try_from(count).map_err(|_| {
                CoordinationError::InvalidInput(format!("expected_count {count} is too large"))
            })?,
            None => self.config.default_expected_count,
        };

        let (arrival, effects) =
            self.barriers
                .enter(&barrier_id, agent_id, expected_count, &self.clock);
        self.execute_all(effects).await;

        Ok(BarrierEnterResponse {
            barrier_id,
            released: arrival.released,
            arrived_count: arrival.arrived_count,
            expected_count: arrival.expected_count,
        })
    }

    /// Fire every expiration timer that is due
    ///
    /// Returns the number of timers that fired.
    pub async fn fire_due_timers(&mut self) -> usize {
        let ready = self.scheduler.poll(self.clock.now());
        let fired = ready.len();

        for item in ready {
            match item.kind {
                ScheduledKind::LockExpiry { lock_id, holder } => {
                    let effects = self.locks.expire(&lock_id, holder, &self.clock);
                    self.execute_all(effects).await;
                }
            }
        }

        fired
    }

    /// Deadline of the next pending expiration
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.scheduler.next_fire_time()
    }

    /// Clean up after an agent whose connection went away
    pub async fn agent_disconnected(&mut self, agent_id: &AgentId) {
        if !self.config.release_on_disconnect {
            tracing::debug!(agent = %agent_id, "disconnect, leaving locks until expiry");
            return;
        }
        let effects = self.locks.abandon(agent_id, &self.clock);
        self.execute_all(effects).await;
    }

    /// Run one maintenance pass
    pub async fn maintain(&mut self, task: &MaintenanceTask<C>) {
        let effects = task.tick(&mut self.locks, &mut self.barriers);
        self.execute_all(effects).await;
    }

    fn resolve_agent(
        &self,
        connection: &ConnectionId,
        agent_id: Option<String>,
    ) -> Result<AgentId, CoordinationError> {
        match agent_id.filter(|id| !id.is_empty()) {
            Some(id) => Ok(AgentId::new(id)),
            None => self.sessions.default_agent_id(connection).ok_or_else(|| {
                CoordinationError::InvalidInput(
                    "agent_id is required when the connection is not registered".to_string(),
                )
            }),
        }
    }

    async fn execute_all(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            self.execute(effect).await;
        }
    }

    async fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::Emit(event) => log_event(&event),
            Effect::Notify { agent_id, event } => {
                // Delivery failures never roll back state
                if let Err(e) = self.notifier.notify(&agent_id, &event).await {
                    tracing::warn!(agent = %agent_id, error = %e, "notification failed");
                }
            }
            Effect::ScheduleExpiry {
                lock_id,
                holder,
                fire_at,
            } => {
                self.scheduler.schedule(
                    lock_expiry_id(&lock_id),
                    fire_at,
                    ScheduledKind::LockExpiry { lock_id, holder },
                );
            }
            Effect::CancelExpiry { lock_id } => {
                self.scheduler.cancel(&lock_expiry_id(&lock_id));
            }
        }
    }
}

fn log_event(event: &Event) {
    match event {
        Event::LockExpired { .. } | Event::LockAbandoned { .. } | Event::BarrierReset { .. } => {
            tracing::info!(event = %event.name(), ?event, "coordination event")
        }
        _ => tracing::debug!(event = %event.name(), ?event, "coordination event"),
    }
}

fn require_id(field: &str, value: Option<String>) -> Result<String, CoordinationError> {
    match value {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(CoordinationError::InvalidInput(format!("{field} is required"))),
    }
}

fn parse_timeout(seconds: f64) -> Result<Duration, CoordinationError> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(CoordinationError::InvalidInput(format!(
            "timeout must be a positive number of seconds, got {seconds}"
        )));
    }
    match Duration::try_from_secs_f64(seconds) {
        Ok(timeout) if timeout <= MAX_LOCK_TIMEOUT => Ok(timeout),
        _ => Err(CoordinationError::InvalidInput(format!(
            "timeout {seconds} exceeds the maximum of {} seconds",
            MAX_LOCK_TIMEOUT.as_secs()
        ))),
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
