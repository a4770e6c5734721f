// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use tracing::{info, warn};

use cs_remote::{EventKind, RemoteEvent};

use super::{Listener, StartFuture, Subscriptions};
use crate::context::SyncContext;
use crate::error::Error;
use crate::membership::GroupMembership;
use crate::resolver::GroupConsistencyResolver;

/// Feeds group snapshots through the consistency resolver.
///
/// On start, a student listed in no group rejoins their latest group.
pub struct GroupsListener {
    ctx: SyncContext,
    resolver: Arc<GroupConsistencyResolver>,
    membership: Arc<GroupMembership>,
    subs: Subscriptions,
}

impl GroupsListener {
    pub fn new(
        ctx: SyncContext,
        resolver: Arc<GroupConsistencyResolver>,
        membership: Arc<GroupMembership>,
    ) -> Self {
        GroupsListener { ctx, resolver, membership, subs: Subscriptions::default() }
    }

    async fn rejoin_latest_group(&self) {
        let in_group = self.ctx.stores.groups.group_for_user(self.ctx.uid()).is_some();
        if self.ctx.user().is_teacher() || in_group {
            return;
        }
        let Some(latest) = self.ctx.stores.latest_group_id.get() else {
            return;
        };
        match self.membership.join_group(&latest).await {
            Ok(()) => info!(group = %latest, "rejoined latest group"),
            Err(e) => warn!(group = %latest, error = %e, "failed to rejoin latest group"),
        }
    }
}

impl Listener for GroupsListener {
    fn name(&self) -> &str {
        "groups"
    }

    fn start(&self) -> StartFuture<'_> {
        Box::pin(async move {
            let path = self.ctx.paths.groups();
            let snapshot = self.ctx.store.get(&path).await.map_err(|e| Error::ListenerStart {
                listener: self.name().to_string(),
                reason: e.to_string(),
            })?;
            self.resolver.handle_snapshot(snapshot.as_ref());
            self.rejoin_latest_group().await;

            self.subs.activate();
            let resolver = Arc::clone(&self.resolver);
            let store = self.ctx.store.as_ref();
            self.subs.on(store, &path, &[EventKind::Value], move |event: &RemoteEvent| {
                resolver.handle_snapshot(event.value.as_ref());
            });
            Ok(())
        })
    }

    fn stop(&self) {
        self.subs.clear(self.ctx.store.as_ref());
        self.resolver.cancel_pending();
    }
}

#[cfg(test)]
#[path = "groups_tests.rs"]
mod tests;
