// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request and response types of the coordination façade
//!
//! Every request field is optional so that missing fields surface as
//! `INVALID_INPUT` from validation instead of a decode failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request to acquire a named lock
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcquireLockRequest {
    #[serde(default)]
    pub lock_id: Option<String>,
    /// Lease duration in seconds
    #[serde(default)]
    pub timeout: Option<f64>,
    #[serde(default)]
    pub agent_id: Option<String>,
}

impl AcquireLockRequest {
    pub fn new(lock_id: impl Into<String>) -> Self {
        Self {
            lock_id: Some(lock_id.into()),
            ..Self::default()
        }
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout = Some(seconds);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquireLockResponse {
    pub lock_id: String,
    pub granted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// 0 when granted, otherwise the 1-based position in the wait queue
    pub queue_position: usize,
}

/// Request to release a held lock
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseLockRequest {
    #[serde(default)]
    pub lock_id: Option<String>,
    #[serde(default)]
    pub agent_id: Option<String>,
}

impl ReleaseLockRequest {
    pub fn new(lock_id: impl Into<String>) -> Self {
        Self {
            lock_id: Some(lock_id.into()),
            ..Self::default()
        }
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }
}

/// Result of a release
///
/// A refused release is not an error at this layer: `released` is false and
/// `error` says why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseLockResponse {
    pub lock_id: String,
    pub released: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Request to enter a barrier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarrierEnterRequest {
    #[serde(default)]
    pub barrier_id: Option<String>,
    #[serde(default)]
    pub expected_count: Option<u64>,
    #[serde(default)]
    pub agent_id: Option<String>,
}

impl BarrierEnterRequest {
    pub fn new(barrier_id: impl Into<String>) -> Self {
        Self {
            barrier_id: Some(barrier_id.into()),
            ..Self::default()
        }
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_expected_count(mut self, count: u64) -> Self {
        self.expected_count = Some(count);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarrierEnterResponse {
    pub barrier_id: String,
    pub released: bool,
    pub arrived_count: usize,
    pub expected_count: usize,
}
