// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::{Arc, Weak};

use futures_util::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use cs_core::records::UserDocumentRecord;
use cs_core::{DocumentType, MonitorMode};
use cs_remote::{EventKind, RemoteEvent};

use super::{children, open_logged, spawn_logged, Listener, StartFuture, Subscriptions};
use crate::context::SyncContext;
use crate::error::Error;
use crate::monitor::DocumentMonitorRegistry;
use crate::opener::OpenRequest;

/// Loads the current user's documents of one type from its typed metadata
/// listing: personal documents, learning logs or planning documents.
pub struct OtherDocumentsListener {
    inner: Arc<Inner>,
}

struct Inner {
    ctx: SyncContext,
    registry: Arc<DocumentMonitorRegistry>,
    doc_type: DocumentType,
    name: String,
    subs: Subscriptions,
}

impl OtherDocumentsListener {
    pub fn new(
        ctx: SyncContext,
        registry: Arc<DocumentMonitorRegistry>,
        doc_type: DocumentType,
    ) -> Self {
        let name = format!("{doc_type}_documents");
        let subs = Subscriptions::default();
        OtherDocumentsListener { inner: Arc::new(Inner { ctx, registry, doc_type, name, subs }) }
    }
}

impl Listener for OtherDocumentsListener {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn start(&self) -> StartFuture<'_> {
        Box::pin(async move {
            let inner = &self.inner;
            let Some(path) = inner.listing_path() else {
                return Err(Error::ListenerStart {
                    listener: inner.name.clone(),
                    reason: format!("{} documents have no listing", inner.doc_type),
                });
            };
            let snapshot = inner.ctx.store.get(&path).await.map_err(|e| Error::ListenerStart {
                listener: inner.name.clone(),
                reason: e.to_string(),
            })?;
            inner.subs.activate();
            let requests =
                children(snapshot).into_iter().filter_map(|(key, value)| inner.request(&key, value));
            join_all(requests.map(|req| open_logged(&inner.ctx, req))).await;

            let weak: Weak<Inner> = Arc::downgrade(inner);
            inner.subs.on(
                inner.ctx.store.as_ref(),
                &path,
                &[EventKind::ChildAdded, EventKind::ChildChanged, EventKind::ChildRemoved],
                move |event: &RemoteEvent| {
                    if let Some(inner) = weak.upgrade() {
                        inner.on_event(event);
                    }
                },
            );
            debug!(doc_type = %inner.doc_type, "watching document listing");
            Ok(())
        })
    }

    fn stop(&self) {
        self.inner.subs.clear(self.inner.ctx.store.as_ref());
    }
}

impl Inner {
    fn listing_path(&self) -> Option<String> {
        let paths = &self.ctx.paths;
        let uid = self.ctx.uid();
        match self.doc_type {
            DocumentType::Personal => Some(paths.user_personal_documents(uid)),
            DocumentType::LearningLog => Some(paths.user_learning_logs(uid)),
            DocumentType::Planning => Some(paths.offering_user_planning_documents(uid)),
            _ => None,
        }
    }

    fn request(&self, key: &str, value: Value) -> Option<OpenRequest> {
        match serde_json::from_value::<UserDocumentRecord>(value) {
            Ok(record) => {
                let mut req = OpenRequest::new(key, self.doc_type, self.ctx.uid());
                if self.doc_type.has_user_metadata() {
                    req = req.title(record.title).properties(record.properties);
                }
                Some(req)
            }
            Err(e) => {
                warn!(
                    doc_type = %self.doc_type,
                    key = %key,
                    error = %e,
                    "skipping malformed document record"
                );
                None
            }
        }
    }

    fn on_event(self: &Arc<Self>, event: &RemoteEvent) {
        let Some(key) = event.key.clone() else {
            return;
        };
        match event.kind {
            EventKind::ChildAdded => {
                let Some(req) = event.value.clone().and_then(|value| self.request(&key, value)) else {
                    return;
                };
                let inner = Arc::clone(self);
                spawn_logged("documents", async move {
                    if inner.subs.is_active() {
                        open_logged(&inner.ctx, req).await;
                    }
                    Ok(())
                });
            }
            EventKind::ChildChanged => {
                let Some(doc) = self.ctx.stores.documents.get_document(&key) else {
                    return;
                };
                // Attached documents push their own metadata.
                if doc.monitor_mode() == MonitorMode::Local || !self.doc_type.has_user_metadata() {
                    return;
                }
                let record = event.value.clone().map(serde_json::from_value::<UserDocumentRecord>);
                if let Some(Ok(record)) = record {
                    if let Some(title) = record.title {
                        doc.set_title(title);
                    }
                    doc.set_properties(record.properties);
                }
            }
            EventKind::ChildRemoved => {
                if let Some(doc) = self.ctx.stores.documents.get_document(&key) {
                    self.registry.unmonitor_document(&doc);
                    self.ctx.stores.documents.remove(&key);
                    debug!(key = %key, doc_type = %self.doc_type, "document removed");
                }
            }
            EventKind::Value => {}
        }
    }
}

#[cfg(test)]
#[path = "documents_tests.rs"]
mod tests;
