// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;

use cs_remote::{EventKind, RemoteEvent};

use super::{children, Listener, StartFuture, Subscriptions};
use crate::context::SyncContext;
use crate::error::Error;

/// Tracks which exemplar documents have been revealed to the current user.
/// The listing maps document keys to a visibility flag.
pub struct ExemplarsListener {
    ctx: SyncContext,
    subs: Subscriptions,
}

impl ExemplarsListener {
    pub fn new(ctx: SyncContext) -> Self {
        ExemplarsListener { ctx, subs: Subscriptions::default() }
    }
}

fn visible_keys(snapshot: Option<Value>) -> BTreeSet<String> {
    children(snapshot)
        .into_iter()
        .filter(|(_, flag)| flag.as_bool() == Some(true))
        .map(|(key, _)| key)
        .collect()
}

impl Listener for ExemplarsListener {
    fn name(&self) -> &str {
        "exemplars"
    }

    fn start(&self) -> StartFuture<'_> {
        Box::pin(async move {
            let path = self.ctx.paths.exemplars(self.ctx.uid());
            let snapshot = self.ctx.store.get(&path).await.map_err(|e| Error::ListenerStart {
                listener: self.name().to_string(),
                reason: e.to_string(),
            })?;
            self.ctx.stores.exemplars.replace_all(visible_keys(snapshot));

            self.subs.activate();
            let stores = Arc::clone(&self.ctx.stores);
            self.subs.on(
                self.ctx.store.as_ref(),
                &path,
                &[EventKind::ChildAdded, EventKind::ChildChanged, EventKind::ChildRemoved],
                move |event: &RemoteEvent| {
                    let Some(key) = event.key.as_deref() else {
                        return;
                    };
                    let visible = event.kind != EventKind::ChildRemoved
                        && event.value.as_ref().and_then(Value::as_bool) == Some(true);
                    stores.exemplars.set_visible(key, visible);
                },
            );
            Ok(())
        })
    }

    fn stop(&self) {
        self.subs.clear(self.ctx.store.as_ref());
    }
}

#[cfg(test)]
#[path = "exemplars_tests.rs"]
mod tests;
