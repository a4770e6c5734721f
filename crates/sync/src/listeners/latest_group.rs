// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::Value;
use tracing::debug;

use cs_remote::{EventKind, RemoteEvent};

use super::{Listener, StartFuture, Subscriptions};
use crate::context::SyncContext;
use crate::error::Error;

/// Mirrors the current user's `latestGroupId` into the stores.
pub struct LatestGroupIdListener {
    ctx: SyncContext,
    subs: Subscriptions,
}

impl LatestGroupIdListener {
    pub fn new(ctx: SyncContext) -> Self {
        LatestGroupIdListener { ctx, subs: Subscriptions::default() }
    }
}

fn group_id(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

impl Listener for LatestGroupIdListener {
    fn name(&self) -> &str {
        "latest_group_id"
    }

    fn start(&self) -> StartFuture<'_> {
        Box::pin(async move {
            let path = self.ctx.paths.latest_group_id(self.ctx.uid());
            let value = self.ctx.store.get(&path).await.map_err(|e| Error::ListenerStart {
                listener: self.name().to_string(),
                reason: e.to_string(),
            })?;
            let latest = group_id(value.as_ref());
            debug!(latest = ?latest, "loaded latest group id");
            self.ctx.stores.latest_group_id.set(latest);

            self.subs.activate();
            let stores = std::sync::Arc::clone(&self.ctx.stores);
            let store = self.ctx.store.as_ref();
            self.subs.on(store, &path, &[EventKind::Value], move |event: &RemoteEvent| {
                stores.latest_group_id.set(group_id(event.value.as_ref()));
            });
            Ok(())
        })
    }

    fn stop(&self) {
        self.subs.clear(self.ctx.store.as_ref());
    }
}

#[cfg(test)]
#[path = "latest_group_tests.rs"]
mod tests;
