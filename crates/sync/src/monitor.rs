// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Per-document content sync direction.
//!
//! Every open document is monitored in at most one direction. In
//! [`MonitorMode::Remote`] a store listener mirrors the remote content into
//! the document; in [`MonitorMode::Local`] a subtree binding pushes local
//! edits to the same path. Switching modes tears down the other half first,
//! so a remote update can never echo back as a local write.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use cs_core::records::DocumentRecord;
use cs_core::{ContentStatus, Document, MonitorMode};
use cs_remote::{EventKind, ListenerId, RemoteEvent};

use crate::binding::ThrottledReactiveBinding;
use crate::context::SyncContext;
use crate::opener::decode_content;

/// What a local content write sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPayload {
    pub content: String,
    pub change_count: u64,
}

impl ContentPayload {
    fn fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("content".into(), Value::String(self.content.clone()));
        fields.insert("changeCount".into(), Value::from(self.change_count));
        fields
    }
}

struct Registration {
    mode: MonitorMode,
    remote: Option<ListenerId>,
    local: Option<ThrottledReactiveBinding<ContentPayload>>,
}

pub struct DocumentMonitorRegistry {
    ctx: SyncContext,
    entries: Mutex<HashMap<String, Registration>>,
}

impl DocumentMonitorRegistry {
    pub fn new(ctx: SyncContext) -> Self {
        DocumentMonitorRegistry { ctx, entries: Mutex::new(HashMap::new()) }
    }

    /// Starts syncing `doc` in the given direction.
    ///
    /// `None` does nothing. `Remote` is a no-op when the document is already
    /// mirrored; otherwise any earlier registration is released first.
    /// `Local` always replaces the earlier registration.
    pub fn monitor_document(&self, doc: &Arc<Document>, mode: MonitorMode) {
        match mode {
            MonitorMode::None => {}
            MonitorMode::Remote => {
                if self.mode_of(doc.key()) == Some(MonitorMode::Remote) {
                    return;
                }
                self.release(doc.key());
                doc.set_monitor_mode(MonitorMode::Remote);
                let id = self.attach_remote(doc);
                self.register(doc, Registration { mode, remote: Some(id), local: None });
            }
            MonitorMode::Local => {
                self.release(doc.key());
                doc.set_monitor_mode(MonitorMode::Local);
                let binding = self.local_binding(doc);
                binding.enable();
                self.register(doc, Registration { mode, remote: None, local: Some(binding) });
            }
        }
        debug!(key = %doc.key(), mode = %mode, "monitoring document");
    }

    /// Stops both directions. Safe on documents that were never monitored.
    pub fn unmonitor_document(&self, doc: &Document) {
        if self.release(doc.key()) {
            doc.set_monitor_mode(MonitorMode::None);
            debug!(key = %doc.key(), "unmonitored document");
        }
    }

    /// Releases every registration.
    pub fn teardown(&self) {
        let entries: Vec<Registration> = {
            let mut map = self.lock();
            map.drain().map(|(_, reg)| reg).collect()
        };
        let count = entries.len();
        for reg in entries {
            self.release_registration(reg);
        }
        if count > 0 {
            debug!(count, "document monitors torn down");
        }
    }

    pub fn mode_of(&self, key: &str) -> Option<MonitorMode> {
        self.lock().get(key).map(|reg| reg.mode)
    }

    pub fn is_monitored(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Registration>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn register(&self, doc: &Document, reg: Registration) {
        let previous = self.lock().insert(doc.key().to_string(), reg);
        // A concurrent monitor call for the same key registered first.
        if let Some(previous) = previous {
            self.release_registration(previous);
        }
    }

    fn release(&self, key: &str) -> bool {
        let removed = self.lock().remove(key);
        match removed {
            Some(reg) => {
                self.release_registration(reg);
                true
            }
            None => false,
        }
    }

    fn release_registration(&self, reg: Registration) {
        if let Some(id) = reg.remote {
            self.ctx.store.off(id);
        }
        if let Some(binding) = reg.local {
            binding.disable();
        }
    }

    fn attach_remote(&self, doc: &Arc<Document>) -> ListenerId {
        let path = self.ctx.paths.user_document(doc.uid(), doc.key());
        let target = Arc::clone(doc);
        self.ctx.store.on(
            &path,
            EventKind::Value,
            Arc::new(move |event: &RemoteEvent| apply_remote_content(&target, event)),
        )
    }

    fn local_binding(&self, doc: &Arc<Document>) -> ThrottledReactiveBinding<ContentPayload> {
        let name = format!("content:{}", doc.key());
        let path = self.ctx.paths.user_document(doc.uid(), doc.key());
        let mutation = self.ctx.update_mutation(&name, path, ContentPayload::fields);
        let counted = Arc::clone(doc);
        ThrottledReactiveBinding::subtree(
            name,
            doc.content_observable().clone(),
            move |content: &Value| ContentPayload {
                content: content.to_string(),
                change_count: counted.increment_change_count(),
            },
            mutation,
            self.ctx.binding_options(),
        )
    }
}

impl Drop for DocumentMonitorRegistry {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn apply_remote_content(doc: &Document, event: &RemoteEvent) {
    if doc.monitor_mode() != MonitorMode::Remote {
        return;
    }
    let Some(value) = event.value.clone() else {
        debug!(key = %doc.key(), "remote content removed");
        return;
    };
    let record: DocumentRecord = match serde_json::from_value(value) {
        Ok(record) => record,
        Err(e) => {
            warn!(key = %doc.key(), error = %e, "ignoring malformed content record");
            return;
        }
    };
    if let Some(count) = record.change_count {
        doc.set_change_count(count);
    }
    match decode_content(record.content.as_deref()) {
        Some(Ok(tree)) => {
            doc.set_content_status(ContentStatus::Valid);
            doc.set_content(tree);
        }
        Some(Err(e)) => {
            warn!(key = %doc.key(), error = %e, "unreadable remote content");
            doc.set_content_status(ContentStatus::Error);
        }
        None => {}
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
