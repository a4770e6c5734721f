// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for remote store operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid path: '{0}'")]
    InvalidPath(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("index error: {0}")]
    Index(String),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl RemoteError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::Unavailable(_) | RemoteError::Sqlite(_))
    }
}

pub type Result<T> = std::result::Result<T, RemoteError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
