// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The remote store interface.
//!
//! The store is a tree of JSON values addressed by `/`-separated paths.
//! Writing `null` deletes. Listeners attach to a path and receive
//! [`RemoteEvent`](crate::event::RemoteEvent)s on the caller's thread.

use serde_json::{json, Map, Value};
use std::future::Future;
use std::pin::Pin;

use crate::error::Result;
use crate::event::{EventCallback, EventKind, ListenerId};

/// Boxed future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Pseudo-path carrying the connection state as a boolean value.
pub const CONNECTED_PATH: &str = ".info/connected";

/// Placeholder the store replaces with its own clock at write time.
pub fn server_timestamp() -> Value {
    json!({".sv": "timestamp"})
}

pub fn is_server_timestamp(value: &Value) -> bool {
    value.as_object().is_some_and(|map| map.len() == 1 && map.get(".sv") == Some(&json!("timestamp")))
}

pub fn child_path(parent: &str, child: &str) -> String {
    let parent = parent.trim_matches('/');
    let child = child.trim_matches('/');
    match (parent.is_empty(), child.is_empty()) {
        (true, _) => child.to_string(),
        (_, true) => parent.to_string(),
        _ => format!("{parent}/{child}"),
    }
}

/// Path-addressed JSON store with change listeners.
pub trait RemoteStore: Send + Sync {
    /// One-shot read. `None` when nothing is stored at the path.
    fn get(&self, path: &str) -> StoreFuture<'_, Option<Value>>;

    /// Replaces the value at the path. `Value::Null` deletes.
    fn set(&self, path: &str, value: Value) -> StoreFuture<'_, ()>;

    /// Applies several child writes under `path` atomically. Keys may be
    /// nested relative paths.
    fn update(&self, path: &str, values: Map<String, Value>) -> StoreFuture<'_, ()>;

    /// Generates a new chronologically ordered child key.
    fn push_key(&self, path: &str) -> String;

    /// Attaches a listener. Existing data is delivered immediately for
    /// `Value` and `ChildAdded` listeners.
    fn on(&self, path: &str, kind: EventKind, callback: EventCallback) -> ListenerId;

    /// Detaches a listener. Unknown ids are ignored.
    fn off(&self, id: ListenerId);

    /// Registers a write the server performs when this client disconnects.
    fn on_disconnect_set(&self, path: &str, value: Value) -> StoreFuture<'_, ()>;

    /// Cancels disconnect writes at or below the path.
    fn cancel_on_disconnect(&self, path: &str) -> StoreFuture<'_, ()>;

    fn is_connected(&self) -> bool;
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
