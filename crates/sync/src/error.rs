// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the sync layer.

use thiserror::Error;

use cs_remote::RemoteError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] cs_core::Error),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("listener '{listener}' failed to start: {reason}")]
    ListenerStart { listener: String, reason: String },

    #[error("user '{0}' is not in a group\n  hint: join a group first")]
    NoGroup(String),

    #[error("document '{0}' cannot be published\n  hint: only problem, personal and learning log documents publish")]
    NotPublishable(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the failure came from a transient remote condition.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Remote(e) if e.is_transient())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
