// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! cs-core: Shared model for the cosync document sync layer
//!
//! This crate provides the document and group data structures, the reactive
//! observable cells they are built from, the remote path scheme, and the
//! in-memory stores that the sync layer keeps current.

pub mod clock;
pub mod document;
pub mod error;
pub mod group;
pub mod observable;
pub mod paths;
pub mod records;
pub mod stores;
pub mod user;

pub use clock::{ClockSource, MockClock, SystemClock};
pub use document::{ContentStatus, Document, DocumentType, MonitorMode, Visibility};
pub use error::{Error, Result};
pub use group::{parse_groups, Group, GroupUser, GroupUserState};
pub use observable::{Disposer, Observable};
pub use paths::{escape_key, PathScheme};
pub use stores::{
    Comment, CommentsStore, DocumentsStore, ExemplarsStore, GroupsStore, Star, StarsStore, Stores,
};
pub use user::{User, UserKind};
