// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote entity listeners.
//!
//! Each listener owns a set of store subscriptions and keeps one part of the
//! local stores current. `start` loads the current remote state before it
//! resolves, then attaches incremental subscriptions. `stop` detaches
//! everything and may be called any number of times.

mod comments;
mod documents;
mod exemplars;
mod groups;
mod latest_group;
mod problem_documents;
mod publications;
mod section_documents;
mod stars;

pub use comments::CommentsListener;
pub use documents::OtherDocumentsListener;
pub use exemplars::ExemplarsListener;
pub use groups::GroupsListener;
pub use latest_group::LatestGroupIdListener;
pub use problem_documents::ProblemDocumentsListener;
pub use publications::PublicationsListener;
pub use section_documents::SectionDocumentsListener;
pub use stars::StarsListener;

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::warn;

use cs_core::{Disposer, Document};
use cs_remote::{EventCallback, EventKind, ListenerId, RemoteEvent, RemoteStore};

use crate::context::SyncContext;
use crate::error::Result;
use crate::opener::{DocumentOpener, OpenRequest};

/// Future returned by [`Listener::start`].
pub type StartFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

pub trait Listener: Send + Sync {
    fn name(&self) -> &str;
    fn start(&self) -> StartFuture<'_>;
    fn stop(&self);
}

/// Store subscriptions and local observers held by one listener, plus
/// whether it is running.
#[derive(Default)]
pub(crate) struct Subscriptions {
    active: AtomicBool,
    ids: Mutex<Vec<ListenerId>>,
    disposers: Mutex<Vec<Disposer>>,
}

impl Subscriptions {
    pub(crate) fn activate(&self) {
        self.active.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Attaches `callback` for each kind at `path`.
    pub(crate) fn on(
        &self,
        store: &dyn RemoteStore,
        path: &str,
        kinds: &[EventKind],
        callback: impl Fn(&RemoteEvent) + Send + Sync + 'static,
    ) {
        let callback: EventCallback = Arc::new(callback);
        let ids: Vec<ListenerId> =
            kinds.iter().map(|kind| store.on(path, *kind, Arc::clone(&callback))).collect();
        self.ids.lock().unwrap_or_else(|e| e.into_inner()).extend(ids);
    }

    pub(crate) fn keep(&self, disposer: Disposer) {
        self.disposers.lock().unwrap_or_else(|e| e.into_inner()).push(disposer);
    }

    /// Marks the listener stopped and detaches everything. Idempotent.
    pub(crate) fn clear(&self, store: &dyn RemoteStore) {
        self.active.store(false, Ordering::SeqCst);
        let ids = std::mem::take(&mut *self.ids.lock().unwrap_or_else(|e| e.into_inner()));
        for id in ids {
            store.off(id);
        }
        let disposers = std::mem::take(&mut *self.disposers.lock().unwrap_or_else(|e| e.into_inner()));
        for disposer in disposers {
            disposer.dispose();
        }
    }
}

/// Runs follow-up work for an event in the background. Failures are logged
/// and never reach the orchestrator.
pub(crate) fn spawn_logged<F>(listener: &'static str, task: F)
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        warn!(listener, "event arrived outside a runtime, dropped");
        return;
    };
    handle.spawn(async move {
        if let Err(e) = task.await {
            warn!(listener, error = %e, "listener task failed");
        }
    });
}

/// Opens a document into the store, logging and swallowing failures.
pub(crate) async fn open_logged(ctx: &SyncContext, req: OpenRequest) -> Option<Arc<Document>> {
    let key = req.key.clone();
    let uid = req.uid.clone();
    match DocumentOpener::new(ctx.clone()).open_into_store(req).await {
        Ok(doc) => Some(doc),
        Err(e) => {
            warn!(key = %key, uid = %uid, error = %e, "failed to open document");
            None
        }
    }
}

/// Direct children of a snapshot, in key order.
pub(crate) fn children(snapshot: Option<Value>) -> Vec<(String, Value)> {
    match snapshot {
        Some(Value::Object(map)) => map.into_iter().collect(),
        _ => Vec::new(),
    }
}
