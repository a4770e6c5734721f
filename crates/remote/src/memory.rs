// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! In-process remote store.
//!
//! [`MemoryStore`] keeps the whole tree in one JSON value behind a mutex.
//! Every write diffs the value at each affected listener path before and
//! after, then delivers the resulting events once the lock is released.
//! Several clients can share one store to observe each other's writes.
//!
//! Connectivity, injected failures and denied paths are controllable so
//! retry and presence behavior can be exercised without a network.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use cs_core::{ClockSource, SystemClock};

use crate::error::{RemoteError, Result};
use crate::event::{EventCallback, EventKind, ListenerId, RemoteEvent};
use crate::store::{child_path, is_server_timestamp, RemoteStore, StoreFuture, CONNECTED_PATH};

/// A write accepted by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRecord {
    pub path: String,
    pub value: Value,
    pub at_ms: u64,
}

struct Registration {
    path: String,
    kind: EventKind,
    callback: EventCallback,
}

struct State {
    root: Value,
    listeners: BTreeMap<ListenerId, Registration>,
    on_disconnect: Vec<(String, Value)>,
    connected: bool,
    fail_writes: usize,
    fail_reads: usize,
    denied: Vec<String>,
    writes: Vec<WriteRecord>,
}

type Dispatch = Vec<(ListenerId, EventCallback, RemoteEvent)>;

pub struct MemoryStore {
    state: Mutex<State>,
    clock: Arc<dyn ClockSource>,
    next_listener: AtomicU64,
    push_counter: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn ClockSource>) -> Self {
        MemoryStore {
            state: Mutex::new(State {
                root: Value::Object(Map::new()),
                listeners: BTreeMap::new(),
                on_disconnect: Vec::new(),
                connected: true,
                fail_writes: 0,
                fail_reads: 0,
                denied: Vec::new(),
                writes: Vec::new(),
            }),
            clock,
            next_listener: AtomicU64::new(1),
            push_counter: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Synchronous read of the stored value.
    pub fn value_at(&self, path: &str) -> Option<Value> {
        lookup(&self.lock().root, path).cloned()
    }

    /// Writes as another client would: no connectivity checks, not logged.
    pub fn server_set(&self, path: &str, value: Value) {
        let dispatch = self.apply(vec![(normalize_path(path), value)], false);
        self.dispatch(dispatch);
    }

    pub fn server_update(&self, path: &str, values: Map<String, Value>) {
        let base = normalize_path(path);
        let writes = values.into_iter().map(|(k, v)| (child_path(&base, &k), v)).collect();
        let dispatch = self.apply(writes, false);
        self.dispatch(dispatch);
    }

    /// Changes connectivity. Going offline runs the registered disconnect
    /// writes; either transition notifies connection listeners.
    pub fn set_connected(&self, connected: bool) {
        let disconnect_writes = {
            let mut state = self.lock();
            if state.connected == connected {
                return;
            }
            state.connected = connected;
            if connected {
                Vec::new()
            } else {
                std::mem::take(&mut state.on_disconnect)
            }
        };
        if !disconnect_writes.is_empty() {
            let dispatch = self.apply(disconnect_writes, false);
            self.dispatch(dispatch);
        }
        let dispatch = {
            let state = self.lock();
            state
                .listeners
                .iter()
                .filter(|(_, reg)| reg.path == CONNECTED_PATH)
                .map(|(id, reg)| (*id, Arc::clone(&reg.callback), connected_event(connected)))
                .collect()
        };
        self.dispatch(dispatch);
    }

    /// The next `count` writes fail with a transient error.
    pub fn fail_next_writes(&self, count: usize) {
        self.lock().fail_writes = count;
    }

    /// The next `count` reads fail with a transient error.
    pub fn fail_next_reads(&self, count: usize) {
        self.lock().fail_reads = count;
    }

    /// Reads and writes at or below `path` are rejected.
    pub fn deny(&self, path: &str) {
        self.lock().denied.push(normalize_path(path));
    }

    pub fn writes(&self) -> Vec<WriteRecord> {
        self.lock().writes.clone()
    }

    /// Accepted writes at or below `path`.
    pub fn writes_under(&self, path: &str) -> Vec<WriteRecord> {
        let path = normalize_path(path);
        self.lock().writes.iter().filter(|w| is_at_or_below(&w.path, &path)).cloned().collect()
    }

    pub fn clear_writes(&self) {
        self.lock().writes.clear();
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    pub fn listener_count_at(&self, path: &str) -> usize {
        let path = normalize_path(path);
        self.lock().listeners.values().filter(|reg| reg.path == path).count()
    }

    /// Pending disconnect writes.
    pub fn disconnect_writes(&self) -> Vec<(String, Value)> {
        self.lock().on_disconnect.clone()
    }

    fn check_write(&self, state: &mut State, paths: &[&str]) -> Result<()> {
        if !state.connected {
            return Err(RemoteError::Unavailable("client is offline".into()));
        }
        if let Some(path) = paths.iter().find(|p| state.is_denied(p)) {
            return Err(RemoteError::PermissionDenied(path.to_string()));
        }
        if state.fail_writes > 0 {
            state.fail_writes -= 1;
            return Err(RemoteError::Unavailable("write rejected by server".into()));
        }
        Ok(())
    }

    fn write(&self, writes: Vec<(String, Value)>) -> Result<()> {
        let dispatch = {
            let mut state = self.lock();
            let paths: Vec<&str> = writes.iter().map(|(p, _)| p.as_str()).collect();
            self.check_write(&mut state, &paths)?;
            self.apply_locked(&mut state, writes, true)
        };
        self.dispatch(dispatch);
        Ok(())
    }

    fn apply(&self, writes: Vec<(String, Value)>, log: bool) -> Dispatch {
        let mut state = self.lock();
        self.apply_locked(&mut state, writes, log)
    }

    fn apply_locked(&self, state: &mut State, writes: Vec<(String, Value)>, log: bool) -> Dispatch {
        let now = self.clock.now_ms();
        let writes: Vec<(String, Value)> =
            writes.into_iter().map(|(path, value)| (path, resolve(value, now))).collect();

        let before: Vec<(ListenerId, Option<Value>)> = state
            .listeners
            .iter()
            .filter(|(_, reg)| writes.iter().any(|(path, _)| is_related(&reg.path, path)))
            .map(|(id, reg)| (*id, lookup(&state.root, &reg.path).cloned()))
            .collect();

        for (path, value) in writes {
            write_at(&mut state.root, &path, value.clone());
            if log {
                state.writes.push(WriteRecord { path, value, at_ms: now });
            }
        }

        let mut dispatch = Vec::new();
        for (id, old) in before {
            let Some(reg) = state.listeners.get(&id) else { continue };
            let new = lookup(&state.root, &reg.path).cloned();
            if old == new {
                continue;
            }
            for event in diff_events(reg, old.as_ref(), new.as_ref()) {
                dispatch.push((id, Arc::clone(&reg.callback), event));
            }
        }
        dispatch
    }

    fn dispatch(&self, dispatch: Dispatch) {
        for (id, callback, event) in dispatch {
            // A callback earlier in the batch may have detached this one.
            if self.lock().listeners.contains_key(&id) {
                callback(&event);
            }
        }
    }

    fn read(&self, path: &str) -> Result<Option<Value>> {
        let mut state = self.lock();
        if !state.connected {
            return Err(RemoteError::Unavailable("client is offline".into()));
        }
        if state.is_denied(path) {
            return Err(RemoteError::PermissionDenied(path.to_string()));
        }
        if state.fail_reads > 0 {
            state.fail_reads -= 1;
            return Err(RemoteError::Unavailable("read rejected by server".into()));
        }
        Ok(lookup(&state.root, path).cloned())
    }
}

impl State {
    fn is_denied(&self, path: &str) -> bool {
        self.denied.iter().any(|denied| is_at_or_below(path, denied))
    }
}

impl RemoteStore for MemoryStore {
    fn get(&self, path: &str) -> StoreFuture<'_, Option<Value>> {
        let path = normalize_path(path);
        Box::pin(async move { self.read(&path) })
    }

    fn set(&self, path: &str, value: Value) -> StoreFuture<'_, ()> {
        let path = normalize_path(path);
        Box::pin(async move { self.write(vec![(path, value)]) })
    }

    fn update(&self, path: &str, values: Map<String, Value>) -> StoreFuture<'_, ()> {
        let base = normalize_path(path);
        Box::pin(async move {
            let writes = values.into_iter().map(|(k, v)| (child_path(&base, &k), v)).collect();
            self.write(writes)
        })
    }

    fn push_key(&self, _path: &str) -> String {
        let counter = self.push_counter.fetch_add(1, Ordering::SeqCst);
        format!("-{:012x}{:06x}", self.clock.now_ms(), counter)
    }

    fn on(&self, path: &str, kind: EventKind, callback: EventCallback) -> ListenerId {
        let path = normalize_path(path);
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::SeqCst));
        let initial: Dispatch = {
            let mut state = self.lock();
            let events = if path == CONNECTED_PATH {
                vec![connected_event(state.connected)]
            } else {
                let reg = Registration { path: path.clone(), kind, callback: Arc::clone(&callback) };
                let current = lookup(&state.root, &path);
                match kind {
                    EventKind::Value => diff_events(&reg, None, current)
                        .into_iter()
                        .chain(current.is_none().then(|| value_event(&path, None)))
                        .collect(),
                    EventKind::ChildAdded => diff_events(&reg, None, current),
                    EventKind::ChildChanged | EventKind::ChildRemoved => Vec::new(),
                }
            };
            state.listeners.insert(id, Registration { path, kind, callback: Arc::clone(&callback) });
            events.into_iter().map(|event| (id, Arc::clone(&callback), event)).collect()
        };
        self.dispatch(initial);
        id
    }

    fn off(&self, id: ListenerId) {
        self.lock().listeners.remove(&id);
    }

    fn on_disconnect_set(&self, path: &str, value: Value) -> StoreFuture<'_, ()> {
        let path = normalize_path(path);
        Box::pin(async move {
            let mut state = self.lock();
            if !state.connected {
                return Err(RemoteError::Unavailable("client is offline".into()));
            }
            state.on_disconnect.retain(|(p, _)| *p != path);
            state.on_disconnect.push((path, value));
            Ok(())
        })
    }

    fn cancel_on_disconnect(&self, path: &str) -> StoreFuture<'_, ()> {
        let path = normalize_path(path);
        Box::pin(async move {
            self.lock().on_disconnect.retain(|(p, _)| !is_at_or_below(p, &path));
            Ok(())
        })
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }
}

fn normalize_path(path: &str) -> String {
    path.split('/').filter(|s| !s.is_empty()).collect::<Vec<_>>().join("/")
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn is_at_or_below(path: &str, ancestor: &str) -> bool {
    ancestor.is_empty()
        || path == ancestor
        || (path.starts_with(ancestor) && path.as_bytes().get(ancestor.len()) == Some(&b'/'))
}

fn is_related(a: &str, b: &str) -> bool {
    is_at_or_below(a, b) || is_at_or_below(b, a)
}

fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut node = root;
    for segment in segments(path) {
        node = node.as_object()?.get(segment)?;
    }
    match node {
        Value::Null => None,
        Value::Object(map) if map.is_empty() => None,
        _ => Some(node),
    }
}

/// Writes `value` at `path`, creating parents as needed and pruning parents
/// left empty by a delete.
fn write_at(root: &mut Value, path: &str, value: Value) {
    let parts: Vec<&str> = segments(path).collect();
    if parts.is_empty() {
        *root = match value {
            Value::Object(_) => value,
            _ => Value::Object(Map::new()),
        };
        return;
    }
    write_parts(root, &parts, value);
}

fn write_parts(node: &mut Value, parts: &[&str], value: Value) {
    let Some((head, rest)) = parts.split_first() else { return };
    if !node.is_object() {
        if value.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }
    let Value::Object(map) = node else { return };
    if rest.is_empty() {
        if value.is_null() {
            map.remove(*head);
        } else {
            map.insert(head.to_string(), value);
        }
        return;
    }
    if value.is_null() && !map.contains_key(*head) {
        return;
    }
    let child = map.entry(head.to_string()).or_insert_with(|| Value::Object(Map::new()));
    write_parts(child, rest, value);
    if matches!(child, Value::Object(m) if m.is_empty()) {
        map.remove(*head);
    }
}

/// Substitutes server timestamps and drops nulls and empty objects.
fn resolve(value: Value, now: u64) -> Value {
    if is_server_timestamp(&value) {
        return Value::from(now);
    }
    match value {
        Value::Object(map) => {
            let resolved: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, resolve(v, now)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if resolved.is_empty() {
                Value::Null
            } else {
                Value::Object(resolved)
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(|v| resolve(v, now)).collect()),
        other => other,
    }
}

fn last_segment(path: &str) -> Option<String> {
    segments(path).last().map(str::to_string)
}

fn value_event(path: &str, value: Option<Value>) -> RemoteEvent {
    RemoteEvent { kind: EventKind::Value, path: path.to_string(), key: last_segment(path), value }
}

fn connected_event(connected: bool) -> RemoteEvent {
    value_event(CONNECTED_PATH, Some(Value::Bool(connected)))
}

fn children(value: Option<&Value>) -> Option<&Map<String, Value>> {
    value.and_then(Value::as_object)
}

fn diff_events(reg: &Registration, old: Option<&Value>, new: Option<&Value>) -> Vec<RemoteEvent> {
    let child_event = |kind, key: &String, value: &Value| RemoteEvent {
        kind,
        path: reg.path.clone(),
        key: Some(key.clone()),
        value: Some(value.clone()),
    };
    let empty = Map::new();
    let old_children = children(old).unwrap_or(&empty);
    let new_children = children(new).unwrap_or(&empty);

    match reg.kind {
        EventKind::Value => match new {
            Some(value) => vec![value_event(&reg.path, Some(value.clone()))],
            None if old.is_some() => vec![value_event(&reg.path, None)],
            None => Vec::new(),
        },
        EventKind::ChildAdded => new_children
            .iter()
            .filter(|(k, _)| !old_children.contains_key(*k))
            .map(|(k, v)| child_event(EventKind::ChildAdded, k, v))
            .collect(),
        EventKind::ChildChanged => new_children
            .iter()
            .filter(|(k, v)| old_children.get(*k).is_some_and(|old| old != *v))
            .map(|(k, v)| child_event(EventKind::ChildChanged, k, v))
            .collect(),
        EventKind::ChildRemoved => old_children
            .iter()
            .filter(|(k, _)| !new_children.contains_key(*k))
            .map(|(k, v)| child_event(EventKind::ChildRemoved, k, v))
            .collect(),
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
