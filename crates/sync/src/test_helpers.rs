// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for unit tests.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use cs_core::{DocumentType, User};
use cs_remote::{MemoryStore, SqliteIndex};

use crate::config::SyncConfig;
use crate::context::SyncContext;

pub const CLASS: &str = "class1";
pub const OFFERING: &str = "offering1";

pub fn student(id: &str) -> User {
    User::student(id, CLASS, OFFERING)
}

pub fn teacher(id: &str) -> User {
    User::teacher(id, CLASS, OFFERING)
}

pub fn config() -> SyncConfig {
    SyncConfig::default()
}

/// A context over a fresh in-memory store and index.
pub fn context(user: User) -> (SyncContext, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (context_on(&store, user), store)
}

/// A second client sharing an existing store.
pub fn context_on(store: &Arc<MemoryStore>, user: User) -> SyncContext {
    let index = Arc::new(SqliteIndex::open_in_memory().unwrap());
    SyncContext::new(Arc::clone(store) as _, index, user, config())
}

/// Writes the content and metadata records for a document.
pub fn seed_document(
    store: &MemoryStore,
    ctx: &SyncContext,
    uid: &str,
    key: &str,
    doc_type: DocumentType,
    content: Value,
) {
    store.server_set(
        &ctx.paths.user_document(uid, key),
        json!({
            "version": "1.0",
            "self": {"uid": uid, "documentKey": key},
            "type": doc_type.as_str(),
            "content": content.to_string(),
            "changeCount": 0
        }),
    );
    store.server_set(
        &ctx.paths.user_document_metadata(uid, key),
        json!({
            "version": "1.0",
            "self": {"uid": uid, "documentKey": key},
            "type": doc_type.as_str(),
            "createdAt": 100
        }),
    );
}

pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// A context over a store whose server timestamps come from `clock`.
pub fn clocked_context(user: User, clock: &Arc<cs_core::MockClock>) -> (SyncContext, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::with_clock(Arc::clone(clock) as _));
    (context_on(&store, user), store)
}
