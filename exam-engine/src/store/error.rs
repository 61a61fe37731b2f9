/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Error types for entity store operations.

/// Result type for entity store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error type for entity store operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A write would break a uniqueness or reference constraint.
    #[error("Constraint violation: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<String> for StoreError {
    fn from(s: String) -> Self {
        StoreError::Internal(s)
    }
}

impl From<&str> for StoreError {
    fn from(s: &str) -> Self {
        StoreError::Internal(s.to_string())
    }
}
