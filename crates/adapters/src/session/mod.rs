// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session lookup: which agent a connection speaks for

use a2a_core::{AgentId, ConnectionId};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeSessionResolver;

/// Resolves the agent a request speaks for when it names none
pub trait SessionResolver: Clone + Send + Sync + 'static {
    fn default_agent_id(&self, connection: &ConnectionId) -> Option<AgentId>;
}

