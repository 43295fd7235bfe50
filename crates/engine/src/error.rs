// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the coordination façade

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable error category sent alongside every failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidInput,
    BackendUnavailable,
    ExecutionFailed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::BackendUnavailable => "BACKEND_UNAVAILABLE",
            ErrorCode::ExecutionFailed => "EXECUTION_FAILED",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by coordination operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("coordination backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl CoordinationError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CoordinationError::InvalidInput(_) => ErrorCode::InvalidInput,
            CoordinationError::BackendUnavailable(_) => ErrorCode::BackendUnavailable,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
