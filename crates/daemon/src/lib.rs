// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Agent coordination router (a2ad)
//!
//! Serves lock and barrier requests from agents over TCP and pushes grant
//! and release events back on the same connection.

pub mod client;
pub mod config;
pub mod lifecycle;
pub mod protocol;
pub mod registry;
pub mod server;

pub use client::{ClientError, RouterClient};
pub use config::{Config, ConfigError, DEFAULT_PORT};
pub use lifecycle::{startup, LifecycleError, Router};
pub use protocol::{Reply, ReplyBody, Request, ServerFrame, StatusReport};
pub use registry::ConnectionRegistry;
