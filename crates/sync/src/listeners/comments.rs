// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use serde_json::Value;

use cs_core::records::CommentRecord;
use cs_core::{Comment, Stores};
use cs_remote::{EventKind, RemoteEvent};

use super::{children, Listener, StartFuture, Subscriptions};
use crate::context::SyncContext;
use crate::error::Error;

/// Keeps comment threads current, one thread per commented document.
pub struct CommentsListener {
    ctx: SyncContext,
    subs: Subscriptions,
}

impl CommentsListener {
    pub fn new(ctx: SyncContext) -> Self {
        CommentsListener { ctx, subs: Subscriptions::default() }
    }
}

fn parse_thread(doc_key: &str, thread: Value) -> Vec<Comment> {
    children(Some(thread))
        .into_iter()
        .filter_map(|(key, raw)| {
            let record: CommentRecord = serde_json::from_value(raw).ok()?;
            Some(Comment {
                key,
                doc_key: doc_key.to_string(),
                uid: record.uid,
                name: record.name,
                content: record.content,
                tile_id: record.tile_id,
                created_at: record.created_at,
            })
        })
        .collect()
}

fn apply_event(stores: &Stores, event: &RemoteEvent) {
    let Some(doc_key) = event.key.as_deref() else {
        return;
    };
    match (event.kind, event.value.clone()) {
        (EventKind::ChildAdded | EventKind::ChildChanged, Some(thread)) => {
            stores.comments.set_document_comments(doc_key, parse_thread(doc_key, thread));
        }
        (EventKind::ChildRemoved, _) => stores.comments.remove_document(doc_key),
        _ => {}
    }
}

impl Listener for CommentsListener {
    fn name(&self) -> &str {
        "comments"
    }

    fn start(&self) -> StartFuture<'_> {
        Box::pin(async move {
            let path = self.ctx.paths.comments();
            let snapshot = self.ctx.store.get(&path).await.map_err(|e| Error::ListenerStart {
                listener: self.name().to_string(),
                reason: e.to_string(),
            })?;
            for (doc_key, thread) in children(snapshot) {
                let comments = parse_thread(&doc_key, thread);
                self.ctx.stores.comments.set_document_comments(&doc_key, comments);
            }

            self.subs.activate();
            let stores = Arc::clone(&self.ctx.stores);
            self.subs.on(
                self.ctx.store.as_ref(),
                &path,
                &[EventKind::ChildAdded, EventKind::ChildChanged, EventKind::ChildRemoved],
                move |event: &RemoteEvent| apply_event(&stores, event),
            );
            Ok(())
        })
    }

    fn stop(&self) {
        self.subs.clear(self.ctx.store.as_ref());
    }
}

#[cfg(test)]
#[path = "comments_tests.rs"]
mod tests;
