// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::{Arc, Weak};

use futures_util::future::join_all;
use serde_json::Value;
use tracing::warn;

use cs_core::records::PublicationRecord;
use cs_core::DocumentType;
use cs_remote::{EventKind, RemoteEvent};

use super::{children, open_logged, spawn_logged, Listener, StartFuture, Subscriptions};
use crate::context::SyncContext;
use crate::error::Error;
use crate::opener::OpenRequest;

/// Loads published documents of one publication type. Publications are
/// immutable snapshots and are never monitored.
pub struct PublicationsListener {
    inner: Arc<Inner>,
}

struct Inner {
    ctx: SyncContext,
    doc_type: DocumentType,
    name: String,
    subs: Subscriptions,
}

impl PublicationsListener {
    pub fn new(ctx: SyncContext, doc_type: DocumentType) -> Self {
        let name = format!("{doc_type}s");
        let subs = Subscriptions::default();
        PublicationsListener { inner: Arc::new(Inner { ctx, doc_type, name, subs }) }
    }
}

fn parse(key: &str, value: Value) -> Option<PublicationRecord> {
    match serde_json::from_value(value) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(key = %key, error = %e, "skipping malformed publication");
            None
        }
    }
}

impl Inner {
    fn request(&self, record: PublicationRecord) -> OpenRequest {
        OpenRequest::new(record.document_key, self.doc_type, record.user_id)
            .title(record.title)
            .group_id(record.group_id)
            .section_id(record.section_id)
    }
}

impl Listener for PublicationsListener {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn start(&self) -> StartFuture<'_> {
        Box::pin(async move {
            let inner = &self.inner;
            let Some(path) = inner.ctx.paths.publications(inner.doc_type) else {
                return Err(Error::ListenerStart {
                    listener: inner.name.clone(),
                    reason: format!("{} is not a publication type", inner.doc_type),
                });
            };
            let snapshot = inner.ctx.store.get(&path).await.map_err(|e| Error::ListenerStart {
                listener: inner.name.clone(),
                reason: e.to_string(),
            })?;
            inner.subs.activate();
            let requests = children(snapshot)
                .into_iter()
                .filter_map(|(key, value)| parse(&key, value))
                .map(|record| inner.request(record));
            join_all(requests.map(|req| open_logged(&inner.ctx, req))).await;

            let weak: Weak<Inner> = Arc::downgrade(inner);
            inner.subs.on(
                inner.ctx.store.as_ref(),
                &path,
                &[EventKind::ChildAdded, EventKind::ChildRemoved],
                move |event: &RemoteEvent| {
                    let parts = (weak.upgrade(), &event.key, event.value.clone());
                    let (Some(inner), Some(key), Some(value)) = parts else {
                        return;
                    };
                    let Some(record) = parse(key, value) else {
                        return;
                    };
                    if event.kind == EventKind::ChildRemoved {
                        inner.ctx.stores.documents.remove(&record.document_key);
                        return;
                    }
                    let req = inner.request(record);
                    spawn_logged("publications", async move {
                        if inner.subs.is_active() {
                            open_logged(&inner.ctx, req).await;
                        }
                        Ok(())
                    });
                },
            );
            Ok(())
        })
    }

    fn stop(&self) {
        self.inner.subs.clear(self.inner.ctx.store.as_ref());
    }
}

#[cfg(test)]
#[path = "publications_tests.rs"]
mod tests;
