// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use cs_core::records::StarRecord;
use cs_core::{Star, Stores};
use cs_remote::{EventKind, RemoteEvent};

use super::{children, Listener, StartFuture, Subscriptions};
use crate::context::SyncContext;
use crate::error::Error;

/// Keeps the stars store equal to the offering's stars.
pub struct StarsListener {
    ctx: SyncContext,
    subs: Subscriptions,
}

impl StarsListener {
    pub fn new(ctx: SyncContext) -> Self {
        StarsListener { ctx, subs: Subscriptions::default() }
    }
}

/// `{docKey: {starKey: StarRecord}}` into stars per document. Malformed
/// entries are dropped.
fn parse_stars(snapshot: Option<Value>) -> BTreeMap<String, Vec<Star>> {
    children(snapshot)
        .into_iter()
        .map(|(doc_key, doc_stars)| {
            let stars = children(Some(doc_stars))
                .into_iter()
                .filter_map(|(key, raw)| {
                    let record: StarRecord = serde_json::from_value(raw).ok()?;
                    Some(Star {
                        key,
                        doc_key: doc_key.clone(),
                        uid: record.uid,
                        starred: record.starred,
                        created_at: record.created_at,
                    })
                })
                .collect();
            (doc_key, stars)
        })
        .collect()
}

fn apply(stores: &Stores, snapshot: Option<Value>) {
    stores.stars.replace_all(parse_stars(snapshot));
}

impl Listener for StarsListener {
    fn name(&self) -> &str {
        "stars"
    }

    fn start(&self) -> StartFuture<'_> {
        Box::pin(async move {
            let path = self.ctx.paths.stars();
            let snapshot = self.ctx.store.get(&path).await.map_err(|e| Error::ListenerStart {
                listener: self.name().to_string(),
                reason: e.to_string(),
            })?;
            apply(&self.ctx.stores, snapshot);

            self.subs.activate();
            let stores = Arc::clone(&self.ctx.stores);
            let store = self.ctx.store.as_ref();
            self.subs.on(store, &path, &[EventKind::Value], move |event: &RemoteEvent| {
                apply(&stores, event.value.clone());
            });
            Ok(())
        })
    }

    fn stop(&self) {
        self.subs.clear(self.ctx.store.as_ref());
    }
}

#[cfg(test)]
#[path = "stars_tests.rs"]
mod tests;
