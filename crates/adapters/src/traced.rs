// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::notify::{NotifyAdapter, NotifyError};
use a2a_core::{AgentEvent, AgentId};
use async_trait::async_trait;

/// Wrapper that adds tracing to any NotifyAdapter
#[derive(Clone)]
pub struct TracedNotifyAdapter<N> {
    inner: N,
}

impl<N> TracedNotifyAdapter<N> {
    pub fn new(inner: N) -> Self {
        Self { inner }
    }
}

fn event_kind(event: &AgentEvent) -> &'static str {
    match event {
        AgentEvent::LockGranted { .. } => "lock_granted",
        AgentEvent::BarrierRelease { .. } => "barrier_release",
    }
}

#[async_trait]
impl<N: NotifyAdapter> NotifyAdapter for TracedNotifyAdapter<N> {
    async fn notify(&self, agent_id: &AgentId, event: &AgentEvent) -> Result<(), NotifyError> {
        let span = tracing::info_span!("notify", agent = %agent_id, kind = event_kind(event));
        let _guard = span.enter();

        let start = std::time::Instant::now();
        let result = self.inner.notify(agent_id, event).await;
        let elapsed = start.elapsed();

        // Undelivered pushes are expected when agents drop off
        match &result {
            Ok(()) => tracing::debug!(elapsed_us = elapsed.as_micros() as u64, "queued"),
            Err(e) => tracing::warn!(error = %e, "notification dropped"),
        }

        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
