// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for cs-core operations.

use thiserror::Error;

/// All possible errors that can occur in cs-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("document metadata missing: {doc_type} '{key}' of user '{uid}' at {path}")]
    MetadataMissing { key: String, doc_type: String, uid: String, path: String },

    #[error("document content missing: {doc_type} '{key}' of user '{uid}' at {path}")]
    ContentMissing { key: String, doc_type: String, uid: String, path: String },

    #[error("invalid document type: '{0}'\n  hint: valid types are: problem, planning, personal, learningLog, publication, personalPublication, learningLogPublication, group")]
    InvalidDocumentType(String),

    #[error("invalid visibility: '{0}'\n  hint: valid values are: private, public")]
    InvalidVisibility(String),

    #[error("invalid path: '{0}'")]
    InvalidPath(String),

    #[error("invalid document content for '{key}': {reason}")]
    InvalidContent { key: String, reason: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for cs-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
