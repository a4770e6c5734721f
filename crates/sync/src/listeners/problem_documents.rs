// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, Weak};

use futures_util::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use cs_core::records::OfferingDocumentRecord;
use cs_core::{DocumentType, MonitorMode};
use cs_remote::{EventKind, ListenerId, RemoteEvent};

use super::{children, open_logged, spawn_logged, Listener, StartFuture, Subscriptions};
use crate::context::SyncContext;
use crate::error::{Error, Result};
use crate::monitor::DocumentMonitorRegistry;
use crate::opener::OpenRequest;

const NAME: &str = "problem_documents";

/// Loads the problem documents of every user this client should see and
/// mirrors other users' documents through the monitor registry.
///
/// A teacher sees every grouped user; a student sees their own group. The
/// watched set is recomputed whenever groups change, and users that drop
/// out of it are fully detached.
pub struct ProblemDocumentsListener {
    inner: Arc<Inner>,
}

struct Inner {
    ctx: SyncContext,
    registry: Arc<DocumentMonitorRegistry>,
    subs: Subscriptions,
    watched: Mutex<BTreeMap<String, Vec<ListenerId>>>,
    reconciling: tokio::sync::Mutex<()>,
}

impl ProblemDocumentsListener {
    pub fn new(ctx: SyncContext, registry: Arc<DocumentMonitorRegistry>) -> Self {
        ProblemDocumentsListener {
            inner: Arc::new(Inner {
                ctx,
                registry,
                subs: Subscriptions::default(),
                watched: Mutex::new(BTreeMap::new()),
                reconciling: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Users whose documents are currently watched.
    pub fn watched_users(&self) -> BTreeSet<String> {
        self.inner.lock_watched().keys().cloned().collect()
    }
}

impl Listener for ProblemDocumentsListener {
    fn name(&self) -> &str {
        NAME
    }

    fn start(&self) -> StartFuture<'_> {
        Box::pin(async move {
            self.inner.subs.activate();
            self.inner.reconcile().await.map_err(|e| Error::ListenerStart {
                listener: NAME.to_string(),
                reason: e.to_string(),
            })?;

            let weak = Arc::downgrade(&self.inner);
            let disposer = self.inner.ctx.stores.groups.subscribe(move |_| {
                if let Some(inner) = weak.upgrade() {
                    spawn_logged(NAME, async move { inner.reconcile().await });
                }
            });
            self.inner.subs.keep(disposer);
            Ok(())
        })
    }

    fn stop(&self) {
        self.inner.subs.clear(self.inner.ctx.store.as_ref());
        let watched = std::mem::take(&mut *self.inner.lock_watched());
        for ids in watched.into_values() {
            for id in ids {
                self.inner.ctx.store.off(id);
            }
        }
    }
}

impl Inner {
    fn lock_watched(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<ListenerId>>> {
        self.watched.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_watching(&self, uid: &str) -> bool {
        self.lock_watched().contains_key(uid)
    }

    fn desired_users(&self) -> BTreeSet<String> {
        let stores = &self.ctx.stores;
        let uid = self.ctx.uid();
        let mut users = if self.ctx.user().is_teacher() {
            stores.groups.all_user_ids()
        } else {
            stores.groups.groupmates(uid)
        };
        users.insert(uid.to_string());
        users
    }

    async fn reconcile(self: &Arc<Self>) -> Result<()> {
        let _guard = self.reconciling.lock().await;
        if !self.subs.is_active() {
            return Ok(());
        }
        let desired = self.desired_users();
        let current: BTreeSet<String> = self.lock_watched().keys().cloned().collect();

        for uid in current.difference(&desired) {
            self.detach_user(uid);
        }
        for uid in desired.difference(&current) {
            self.attach_user(uid).await?;
        }
        Ok(())
    }

    async fn attach_user(self: &Arc<Self>, uid: &str) -> Result<()> {
        let path = self.ctx.paths.offering_user_documents(uid);
        let snapshot = self.ctx.store.get(&path).await?;
        // Watch before opening so the opens below are not treated as stale.
        self.lock_watched().insert(uid.to_string(), Vec::new());

        let opens = children(snapshot)
            .into_iter()
            .filter_map(|(key, value)| self.request(uid, &key, value));
        join_all(opens.map(|req| self.load(req))).await;

        let weak: Weak<Inner> = Arc::downgrade(self);
        let owner = uid.to_string();
        let kinds = [EventKind::ChildAdded, EventKind::ChildChanged, EventKind::ChildRemoved];
        let ids: Vec<ListenerId> = kinds
            .iter()
            .map(|kind| {
                let weak = weak.clone();
                let owner = owner.clone();
                self.ctx.store.on(
                    &path,
                    *kind,
                    Arc::new(move |event: &RemoteEvent| {
                        if let Some(inner) = weak.upgrade() {
                            inner.on_event(&owner, event);
                        }
                    }),
                )
            })
            .collect();

        match self.lock_watched().get_mut(uid) {
            Some(slot) => slot.extend(ids),
            None => ids.into_iter().for_each(|id| self.ctx.store.off(id)),
        }
        debug!(uid = %uid, "watching problem documents");
        Ok(())
    }

    fn detach_user(&self, uid: &str) {
        if let Some(ids) = self.lock_watched().remove(uid) {
            for id in ids {
                self.ctx.store.off(id);
            }
        }
        for doc in self.ctx.stores.documents.by_uid(uid) {
            if doc.doc_type() == DocumentType::Problem {
                self.registry.unmonitor_document(&doc);
                self.ctx.stores.documents.remove(doc.key());
            }
        }
        debug!(uid = %uid, "stopped watching problem documents");
    }

    fn request(&self, uid: &str, key: &str, value: Value) -> Option<OpenRequest> {
        match serde_json::from_value::<OfferingDocumentRecord>(value) {
            Ok(record) => Some(
                OpenRequest::new(key, DocumentType::Problem, uid)
                    .visibility(record.visibility)
                    .group_id(record.self_.group_id),
            ),
            Err(e) => {
                warn!(uid = %uid, key = %key, error = %e, "skipping malformed problem document record");
                None
            }
        }
    }

    async fn load(&self, req: OpenRequest) {
        let uid = req.uid.clone();
        let Some(doc) = open_logged(&self.ctx, req).await else {
            return;
        };
        if uid != self.ctx.uid() && self.subs.is_active() && self.is_watching(&uid) {
            self.registry.monitor_document(&doc, MonitorMode::Remote);
        }
    }

    fn on_event(self: &Arc<Self>, uid: &str, event: &RemoteEvent) {
        let Some(key) = event.key.clone() else {
            return;
        };
        match event.kind {
            EventKind::ChildAdded => {
                let Some(value) = event.value.clone() else {
                    return;
                };
                if let Some(req) = self.request(uid, &key, value) {
                    let inner = Arc::clone(self);
                    spawn_logged(NAME, async move {
                        inner.load(req).await;
                        Ok(())
                    });
                }
            }
            EventKind::ChildChanged => {
                let Some(doc) = self.ctx.stores.documents.get_document(&key) else {
                    return;
                };
                if doc.monitor_mode() == MonitorMode::Local {
                    return;
                }
                let record = event.value.clone().map(serde_json::from_value::<OfferingDocumentRecord>);
                if let Some(Ok(record)) = record {
                    doc.set_visibility(record.visibility);
                }
            }
            EventKind::ChildRemoved => {
                if let Some(doc) = self.ctx.stores.documents.get_document(&key) {
                    self.registry.unmonitor_document(&doc);
                    self.ctx.stores.documents.remove(&key);
                    debug!(key = %key, uid = %uid, "problem document removed");
                }
            }
            EventKind::Value => {}
        }
    }
}

#[cfg(test)]
#[path = "problem_documents_tests.rs"]
mod tests;
