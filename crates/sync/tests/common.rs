// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]

use std::sync::Arc;
use std::time::Duration;

pub use cosync::{SyncConfig, SyncSession};
pub use cs_core::{Document, DocumentType, MonitorMode, User, Visibility};
pub use cs_remote::{MemoryStore, RemoteStore, SqliteIndex};
pub use serde_json::{json, Value};

pub const CLASS: &str = "class1";
pub const OFFERING: &str = "offering1";

pub fn student(id: &str) -> User {
    User::student(id, CLASS, OFFERING)
}

pub fn teacher(id: &str) -> User {
    User::teacher(id, CLASS, OFFERING)
}

pub fn shared_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

/// A client session over a store that other clients may share.
pub fn client(store: &Arc<MemoryStore>, user: User) -> SyncSession {
    let index = Arc::new(SqliteIndex::open_in_memory().unwrap());
    SyncSession::new(Arc::clone(store) as _, index, user, SyncConfig::default())
}

pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Writes a group record as another client would. Each user is
/// `(uid, connectedTimestamp, removed)`.
pub fn seed_group(
    store: &MemoryStore,
    session: &SyncSession,
    group_id: &str,
    users: &[(&str, i64, bool)],
) {
    let members: serde_json::Map<String, Value> = users
        .iter()
        .map(|(uid, ts, removed)| {
            let mut user = json!({"self": {"uid": uid}, "connectedTimestamp": ts});
            if *removed {
                user["state"] = json!("removed");
            }
            (uid.to_string(), user)
        })
        .collect();
    store.server_set(
        &session.context().paths.group(group_id),
        json!({"version": "1.0", "self": {"groupId": group_id}, "users": members}),
    );
}

/// User ids listed under a group in the remote store.
pub fn remote_members(store: &MemoryStore, session: &SyncSession, group_id: &str) -> Vec<String> {
    let path = format!("{}/users", session.context().paths.group(group_id));
    match store.value_at(&path) {
        Some(Value::Object(users)) => users.keys().cloned().collect(),
        _ => Vec::new(),
    }
}
