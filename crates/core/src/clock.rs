// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling
//!
//! Deadlines are tracked on the monotonic clock. Wall-clock time is only used
//! when a deadline has to be reported to an agent.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A clock that provides the current time
pub trait Clock: Clone + Send + Sync {
    /// Monotonic time, used for every deadline comparison
    fn now(&self) -> Instant;

    /// Wall-clock time, used for reporting
    fn utc_now(&self) -> DateTime<Utc>;

    /// Project a monotonic instant onto the wall clock
    fn to_utc(&self, instant: Instant) -> DateTime<Utc> {
        let now = self.now();
        let utc_now = self.utc_now();
        if instant >= now {
            utc_now
                .checked_add_signed(chrono_duration(instant.duration_since(now)))
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        } else {
            utc_now
                .checked_sub_signed(chrono_duration(now.duration_since(instant)))
                .unwrap_or(DateTime::<Utc>::MIN_UTC)
        }
    }
}

fn chrono_duration(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

/// Real system clock
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fake clock for testing with controllable time
///
/// Wall time moves in lockstep with the monotonic reading.
#[derive(Clone)]
pub struct FakeClock {
    current: Arc<Mutex<Instant>>,
    origin: Instant,
    utc_origin: DateTime<Utc>,
}

impl FakeClock {
    pub fn new() -> Self {
        let origin = Instant::now();
        Self {
            current: Arc::new(Mutex::new(origin)),
            origin,
            utc_origin: Utc::now(),
        }
    }

    /// Advance the clock by the given duration
    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current += duration;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn utc_now(&self) -> DateTime<Utc> {
        let elapsed = self.now().saturating_duration_since(self.origin);
        self.utc_origin
            .checked_add_signed(chrono_duration(elapsed))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
