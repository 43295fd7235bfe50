// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake notification adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{NotifyAdapter, NotifyError};
use a2a_core::{AgentEvent, AgentId};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Recorded notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyCall {
    pub agent_id: AgentId,
    pub event: AgentEvent,
}

#[derive(Default)]
struct FakeNotifyState {
    calls: Vec<NotifyCall>,
    unreachable: HashSet<AgentId>,
}

/// Fake notification adapter for testing
#[derive(Clone, Default)]
pub struct FakeNotifyAdapter {
    inner: Arc<Mutex<FakeNotifyState>>,
}

impl FakeNotifyAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make deliveries to an agent fail (the attempt is still recorded)
    pub fn set_unreachable(&self, agent_id: impl Into<String>) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .unreachable
            .insert(AgentId::new(agent_id));
    }

    /// Get all recorded notifications
    pub fn calls(&self) -> Vec<NotifyCall> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clone()
    }

    /// Events sent to one agent, in order
    pub fn events_for(&self, agent_id: &str) -> Vec<AgentEvent> {
        self.calls()
            .into_iter()
            .filter(|c| c.agent_id.as_str() == agent_id)
            .map(|c| c.event)
            .collect()
    }

    pub fn clear(&self) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clear();
    }
}

#[async_trait]
impl NotifyAdapter for FakeNotifyAdapter {
    async fn notify(&self, agent_id: &AgentId, event: &AgentEvent) -> Result<(), NotifyError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.calls.push(NotifyCall {
            agent_id: agent_id.clone(),
            event: event.clone(),
        });
        if inner.unreachable.contains(agent_id) {
            return Err(NotifyError::Unreachable(agent_id.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
