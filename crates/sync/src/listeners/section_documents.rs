// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::{Arc, Weak};

use futures_util::future::join_all;
use serde_json::Value;
use tracing::warn;

use cs_core::records::OfferingDocumentRecord;
use cs_core::DocumentType;
use cs_remote::{EventKind, RemoteEvent};

use super::{children, open_logged, spawn_logged, Listener, StartFuture, Subscriptions};
use crate::context::SyncContext;
use crate::error::Error;
use crate::opener::OpenRequest;

/// Loads the current user's per-section documents. The listing is keyed
/// by section id and each entry names the document holding that section.
pub struct SectionDocumentsListener {
    inner: Arc<Inner>,
}

struct Inner {
    ctx: SyncContext,
    subs: Subscriptions,
}

impl SectionDocumentsListener {
    pub fn new(ctx: SyncContext) -> Self {
        SectionDocumentsListener { inner: Arc::new(Inner { ctx, subs: Subscriptions::default() }) }
    }
}

impl Inner {
    fn request(&self, section_id: &str, value: Value) -> Option<OpenRequest> {
        match serde_json::from_value::<OfferingDocumentRecord>(value) {
            Ok(record) => Some(
                OpenRequest::new(record.document_key, DocumentType::Problem, self.ctx.uid())
                    .section_id(Some(section_id.to_string()))
                    .visibility(record.visibility),
            ),
            Err(e) => {
                warn!(section = %section_id, error = %e, "skipping malformed section document record");
                None
            }
        }
    }
}

impl Listener for SectionDocumentsListener {
    fn name(&self) -> &str {
        "section_documents"
    }

    fn start(&self) -> StartFuture<'_> {
        Box::pin(async move {
            let inner = &self.inner;
            let path = inner.ctx.paths.offering_user_section_documents(inner.ctx.uid());
            let snapshot = inner.ctx.store.get(&path).await.map_err(|e| Error::ListenerStart {
                listener: self.name().to_string(),
                reason: e.to_string(),
            })?;
            inner.subs.activate();
            let requests = children(snapshot)
                .into_iter()
                .filter_map(|(section, value)| inner.request(&section, value));
            join_all(requests.map(|req| open_logged(&inner.ctx, req))).await;

            let weak: Weak<Inner> = Arc::downgrade(inner);
            inner.subs.on(
                inner.ctx.store.as_ref(),
                &path,
                &[EventKind::ChildAdded, EventKind::ChildRemoved],
                move |event: &RemoteEvent| {
                    let parts = (weak.upgrade(), &event.key, event.value.clone());
                    let (Some(inner), Some(section), Some(value)) = parts else {
                        return;
                    };
                    let Some(req) = inner.request(section, value) else {
                        return;
                    };
                    if event.kind == EventKind::ChildRemoved {
                        inner.ctx.stores.documents.remove(&req.key);
                        return;
                    }
                    spawn_logged("section_documents", async move {
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
#[path = "section_documents_tests.rs"]
mod tests;
