// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! cs-remote: Remote store abstraction for cosync
//!
//! Defines the path-addressed JSON store interface the sync layer writes to
//! and listens on, an in-process [`MemoryStore`] implementation, and the
//! SQLite-backed metadata index used for document queries.

pub mod error;
pub mod event;
pub mod index;
pub mod memory;
pub mod store;

pub use error::{RemoteError, Result};
pub use event::{EventCallback, EventKind, ListenerId, RemoteEvent};
pub use index::{IndexRecord, MetadataIndex, SqliteIndex};
pub use memory::{MemoryStore, WriteRecord};
pub use store::{
    child_path, is_server_timestamp, server_timestamp, RemoteStore, StoreFuture, CONNECTED_PATH,
};
