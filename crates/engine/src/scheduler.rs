// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer queue for lock expiration
//!
//! Timers are keyed by id. Scheduling an id that is already pending replaces
//! the earlier timer, so at most one timer per id can ever fire.

use a2a_core::AgentId;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Instant;

/// A scheduled item
#[derive(Debug, Clone)]
pub struct ScheduledItem {
    pub id: String,
    pub fire_at: Instant,
    pub kind: ScheduledKind,
    generation: u64,
}

/// The kind of scheduled event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduledKind {
    /// Lease of `holder` on `lock_id` runs out
    LockExpiry { lock_id: String, holder: AgentId },
}

impl PartialEq for ScheduledItem {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at && self.generation == other.generation
    }
}

impl Eq for ScheduledItem {}

impl PartialOrd for ScheduledItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Min-heap: earliest first, then in scheduling order
        Reverse((self.fire_at, self.generation)).cmp(&Reverse((other.fire_at, other.generation)))
    }
}

/// Stale entries tolerated in the heap before it is rebuilt
const COMPACT_SLACK: usize = 32;

/// Manages scheduled events
#[derive(Debug, Default)]
pub struct Scheduler {
    items: BinaryHeap<ScheduledItem>,
    /// Generation of the live timer for each pending id
    live: HashMap<String, u64>,
    next_generation: u64,
}

/// Timer id used for the expiration of a lock
pub fn lock_expiry_id(lock_id: &str) -> String {
    format!("lock-expiry:{lock_id}")
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a one-shot timer, replacing any pending timer with the same id
    pub fn schedule(&mut self, id: impl Into<String>, fire_at: Instant, kind: ScheduledKind) {
        let id = id.into();
        let generation = self.next_generation;
        self.next_generation += 1;

        self.live.insert(id.clone(), generation);
        self.items.push(ScheduledItem {
            id,
            fire_at,
            kind,
            generation,
        });
        self.compact();
    }

    /// Cancel a pending timer
    pub fn cancel(&mut self, id: &str) {
        self.live.remove(id);
        self.compact();
    }

    /// Pop every live timer whose fire time is at or before `now`
    pub fn poll(&mut self, now: Instant) -> Vec<ScheduledItem> {
        let mut ready = Vec::new();

        while let Some(item) = self.items.peek() {
            if item.fire_at > now {
                break;
            }
            let Some(item) = self.items.pop() else {
                break;
            };
            if self.is_live(&item) {
                self.live.remove(&item.id);
                ready.push(item);
            }
        }

        ready
    }

    /// Fire time of the earliest live timer
    ///
    /// Superseded and cancelled entries at the head of the queue are
    /// discarded along the way.
    pub fn next_fire_time(&mut self) -> Option<Instant> {
        while let Some(item) = self.items.peek() {
            if self.is_live(item) {
                return Some(item.fire_at);
            }
            self.items.pop();
        }
        None
    }

    /// Whether a timer with this id is pending
    pub fn contains(&self, id: &str) -> bool {
        self.live.contains_key(id)
    }

    /// Number of pending timers
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Drop superseded and cancelled entries once they outnumber live ones
    fn compact(&mut self) {
        if self.items.len() <= 2 * self.live.len() + COMPACT_SLACK {
            return;
        }
        let live = &self.live;
        self.items.retain(|item| live.get(&item.id) == Some(&item.generation));
    }

    fn is_live(&self, item: &ScheduledItem) -> bool {
        self.live.get(&item.id) == Some(&item.generation)
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
