// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Starts and stops the listener family in dependency order.

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{error, info, warn};

use cs_core::{DocumentType, Observable};

use crate::context::SyncContext;
use crate::error::Result;
use crate::listeners::{
    CommentsListener, ExemplarsListener, GroupsListener, LatestGroupIdListener, Listener,
    OtherDocumentsListener, ProblemDocumentsListener, PublicationsListener,
    SectionDocumentsListener, StarsListener,
};
use crate::membership::GroupMembership;
use crate::monitor::DocumentMonitorRegistry;
use crate::resolver::GroupConsistencyResolver;

/// Owns every listener. The first listener must start for the
/// orchestrator to start; the others start together and a failure in one
/// only keeps that one down.
pub struct ListenerOrchestrator {
    registry: Arc<DocumentMonitorRegistry>,
    first: Arc<dyn Listener>,
    rest: Vec<Arc<dyn Listener>>,
    listening: Observable<bool>,
}

impl ListenerOrchestrator {
    /// The standard listener set for a session.
    pub fn new(
        ctx: &SyncContext,
        registry: Arc<DocumentMonitorRegistry>,
        membership: Arc<GroupMembership>,
    ) -> Self {
        let resolver =
            Arc::new(GroupConsistencyResolver::new(ctx.clone(), Arc::clone(&membership)));
        let documents = |doc_type| -> Arc<dyn Listener> {
            Arc::new(OtherDocumentsListener::new(ctx.clone(), Arc::clone(&registry), doc_type))
        };
        let publications = |doc_type| -> Arc<dyn Listener> {
            Arc::new(PublicationsListener::new(ctx.clone(), doc_type))
        };
        let rest: Vec<Arc<dyn Listener>> = vec![
            Arc::new(GroupsListener::new(ctx.clone(), resolver, membership)),
            Arc::new(ProblemDocumentsListener::new(ctx.clone(), Arc::clone(&registry))),
            documents(DocumentType::Planning),
            documents(DocumentType::Personal),
            documents(DocumentType::LearningLog),
            publications(DocumentType::ProblemPublication),
            publications(DocumentType::PersonalPublication),
            publications(DocumentType::LearningLogPublication),
            Arc::new(SectionDocumentsListener::new(ctx.clone())),
            Arc::new(StarsListener::new(ctx.clone())),
            Arc::new(CommentsListener::new(ctx.clone())),
            Arc::new(ExemplarsListener::new(ctx.clone())),
        ];
        let first: Arc<dyn Listener> = Arc::new(LatestGroupIdListener::new(ctx.clone()));
        Self::with_listeners(registry, first, rest)
    }

    pub fn with_listeners(
        registry: Arc<DocumentMonitorRegistry>,
        first: Arc<dyn Listener>,
        rest: Vec<Arc<dyn Listener>>,
    ) -> Self {
        ListenerOrchestrator { registry, first, rest, listening: Observable::new(false) }
    }

    pub fn is_listening(&self) -> bool {
        self.listening.get()
    }

    /// Observable form of [`is_listening`](Self::is_listening).
    pub fn listening(&self) -> &Observable<bool> {
        &self.listening
    }

    pub fn listener_names(&self) -> Vec<String> {
        std::iter::once(&self.first).chain(&self.rest).map(|l| l.name().to_string()).collect()
    }

    /// Starts the first listener, then all others concurrently. Fails only
    /// if the first listener fails. Starting twice is a no-op.
    pub async fn start(&self) -> Result<()> {
        if self.is_listening() {
            return Ok(());
        }
        if let Err(e) = self.first.start().await {
            error!(listener = %self.first.name(), error = %e, "required listener failed to start");
            self.first.stop();
            return Err(e);
        }

        let results = join_all(self.rest.iter().map(|listener| async move {
            (listener, listener.start().await)
        }))
        .await;
        let mut failed = 0usize;
        for (listener, result) in results {
            if let Err(e) = result {
                failed += 1;
                warn!(listener = %listener.name(), error = %e, "listener failed to start");
                listener.stop();
            }
        }

        self.listening.set(true);
        info!(listeners = self.rest.len() + 1, failed, "listening");
        Ok(())
    }

    /// Stops everything in reverse start order. Idempotent.
    pub async fn stop(&self) {
        let was_listening = self.listening.set(false);
        self.registry.teardown();
        for listener in self.rest.iter().rev() {
            listener.stop();
        }
        self.first.stop();
        if was_listening {
            info!("stopped listening");
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
