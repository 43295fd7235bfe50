// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent notification adapters
//!
//! Delivery is best effort: callers log failures and move on.

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeNotifyAdapter, NotifyCall};

use a2a_core::{AgentEvent, AgentId};
use async_trait::async_trait;
use thiserror::Error;

/// Errors from notification delivery
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("agent not connected: {0}")]
    Unreachable(AgentId),
    #[error("outbound queue full for agent {0}")]
    Backpressure(AgentId),
}

/// Adapter delivering events to agents
#[async_trait]
pub trait NotifyAdapter: Clone + Send + Sync + 'static {
    /// Hand an event to the agent's connection without waiting for delivery
    async fn notify(&self, agent_id: &AgentId, event: &AgentEvent) -> Result<(), NotifyError>;
}
