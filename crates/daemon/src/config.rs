// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration
//!
//! Loaded from an optional TOML file; every field has a default.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use a2a_core::MaintenanceConfig;
use a2a_engine::CoordinatorConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Port the router listens on by default
pub const DEFAULT_PORT: u16 = 8766;

/// Daemon configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Address the router listens on
    pub listen: SocketAddr,
    /// Log file; logs go to stderr when unset
    pub log_path: Option<PathBuf>,
    /// Frames buffered per connection before pushes are dropped
    pub outbound_capacity: usize,
    pub coordinator: CoordinatorConfig,
    pub maintenance: MaintenanceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            log_path: None,
            outbound_capacity: 64,
            coordinator: CoordinatorConfig::default(),
            maintenance: MaintenanceConfig::default(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl Config {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the router cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.outbound_capacity == 0 {
            return Err(ConfigError::Invalid(
                "outbound_capacity must be at least 1".to_string(),
            ));
        }
        if self.coordinator.default_lock_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "coordinator.default_lock_timeout must be positive".to_string(),
            ));
        }
        if self.coordinator.default_lock_timeout > a2a_core::MAX_LOCK_TIMEOUT {
            return Err(ConfigError::Invalid(
                "coordinator.default_lock_timeout exceeds one year".to_string(),
            ));
        }
        if self.coordinator.default_expected_count == 0 {
            return Err(ConfigError::Invalid(
                "coordinator.default_expected_count must be at least 1".to_string(),
            ));
        }
        if self.maintenance.interval.is_zero() {
            return Err(ConfigError::Invalid(
                "maintenance.interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
