// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Change notifications delivered to listeners.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Which changes a listener receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The whole value at the path, on every change.
    Value,
    /// A direct child appeared.
    ChildAdded,
    /// A direct child's value changed.
    ChildChanged,
    /// A direct child disappeared.
    ChildRemoved,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::Value => "value",
            EventKind::ChildAdded => "child_added",
            EventKind::ChildChanged => "child_changed",
            EventKind::ChildRemoved => "child_removed",
        };
        write!(f, "{s}")
    }
}

/// A single change notification.
///
/// For child events `key` names the child and `value` is the child's value
/// (its last value, for removals). For value events `key` is the last path
/// segment and `value` is `None` when nothing is stored at the path.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEvent {
    pub kind: EventKind,
    pub path: String,
    pub key: Option<String>,
    pub value: Option<Value>,
}

/// Handle returned by `on`, passed to `off` to detach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

pub type EventCallback = Arc<dyn Fn(&RemoteEvent) + Send + Sync>;
