// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Editing-session sync for a single document.
//!
//! Attaching a [`DocumentSyncFacade`] starts pushing local edits of one
//! document to the remote store. Content always goes through the monitor
//! registry in [`MonitorMode::Local`]; the metadata that syncs depends on
//! the document type:
//!
//! | Type | Metadata bindings |
//! |------|-------------------|
//! | problem | visibility to the offering record |
//! | personal, learning log | title and properties, mirrored into the index |
//! | planning | none |
//!
//! Read-only documents, publications and documents owned by another user
//! are never monitored. Metadata fields whose write was given up on are
//! reported by [`DocumentSyncFacade::unsaved_fields`] until a later write
//! of the same field lands.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use cs_core::{Document, DocumentType, MonitorMode, Visibility};
use cs_remote::server_timestamp;

use crate::binding::{Binding, ThrottledReactiveBinding};
use crate::context::SyncContext;
use crate::error::Result;
use crate::monitor::DocumentMonitorRegistry;
use crate::mutation::RetryableMutation;

type UnsavedFields = Arc<Mutex<BTreeSet<&'static str>>>;

pub struct DocumentSyncFacade {
    ctx: SyncContext,
    registry: Arc<DocumentMonitorRegistry>,
    doc: Arc<Document>,
    read_only: bool,
    bindings: Vec<Box<dyn Binding>>,
    unsaved: UnsavedFields,
    attached: AtomicBool,
}

impl DocumentSyncFacade {
    pub fn new(
        ctx: SyncContext,
        registry: Arc<DocumentMonitorRegistry>,
        doc: Arc<Document>,
        read_only: bool,
    ) -> Self {
        let unsaved = UnsavedFields::default();
        let bindings = metadata_bindings(&ctx, &doc, &unsaved);
        DocumentSyncFacade {
            ctx,
            registry,
            doc,
            read_only,
            bindings,
            unsaved,
            attached: AtomicBool::new(false),
        }
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.doc
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    /// Metadata fields whose latest write failed for good.
    pub fn unsaved_fields(&self) -> Vec<&'static str> {
        self.unsaved.lock().unwrap_or_else(|e| e.into_inner()).iter().copied().collect()
    }

    /// Whether attaching would sync anything.
    pub fn is_syncable(&self) -> bool {
        !self.read_only && self.doc.is_editable_by(self.ctx.uid())
    }

    /// Starts syncing local edits. Idempotent. Documents that may not be
    /// written from here are left unmonitored.
    pub async fn attach(&self) -> Result<()> {
        if !self.is_syncable() {
            if !self.read_only && !self.doc.doc_type().is_publication() {
                warn!(
                    key = %self.doc.key(),
                    owner = %self.doc.uid(),
                    "not syncing a document owned by another user"
                );
            }
            return Ok(());
        }
        if self.attached.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        for binding in &self.bindings {
            binding.set_enabled(true);
        }
        self.registry.monitor_document(&self.doc, MonitorMode::Local);

        let path = self.last_edited_path();
        if let Err(e) = self.ctx.store.on_disconnect_set(&path, server_timestamp()).await {
            warn!(key = %self.doc.key(), error = %e, "failed to arm lastEditedAt");
        }
        debug!(key = %self.doc.key(), doc_type = %self.doc.doc_type(), "document attached");
        Ok(())
    }

    /// Stops syncing and stamps `lastEditedAt`. Idempotent.
    ///
    /// Local teardown always completes; the returned error is from the
    /// final remote writes.
    pub async fn detach(&self) -> Result<()> {
        if !self.attached.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.release_local();

        let path = self.last_edited_path();
        self.ctx.store.cancel_on_disconnect(&path).await?;
        self.ctx.store.set(&path, server_timestamp()).await?;
        debug!(key = %self.doc.key(), "document detached");
        Ok(())
    }

    fn release_local(&self) {
        for binding in &self.bindings {
            binding.set_enabled(false);
        }
        self.registry.unmonitor_document(&self.doc);
    }

    fn last_edited_path(&self) -> String {
        self.ctx.paths.last_edited_at(self.doc.uid(), self.doc.key())
    }
}

impl Drop for DocumentSyncFacade {
    fn drop(&mut self) {
        if !self.attached.swap(false, Ordering::SeqCst) {
            return;
        }
        self.release_local();

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let store = Arc::clone(&self.ctx.store);
        let path = self.last_edited_path();
        let key = self.doc.key().to_string();
        handle.spawn(async move {
            let result = match store.cancel_on_disconnect(&path).await {
                Ok(()) => store.set(&path, server_timestamp()).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                warn!(key = %key, error = %e, "failed to stamp lastEditedAt");
            }
        });
    }
}

fn metadata_bindings(
    ctx: &SyncContext,
    doc: &Arc<Document>,
    unsaved: &UnsavedFields,
) -> Vec<Box<dyn Binding>> {
    let key = doc.key();
    let Some(path) = ctx.paths.typed_metadata(doc.uid(), doc.doc_type(), key) else {
        return Vec::new();
    };

    match doc.doc_type() {
        DocumentType::Problem => {
            let mutation = field_mutation(ctx, key, "visibility", path, unsaved, |v: &Visibility| {
                Value::from(v.as_str())
            });
            let visibility: Box<dyn Binding> = Box::new(ThrottledReactiveBinding::scalar(
                format!("visibility:{key}"),
                doc.visibility_observable().clone(),
                mutation,
                ctx.binding_options(),
            ));
            vec![visibility]
        }
        DocumentType::Personal | DocumentType::LearningLog => {
            let mutation =
                field_mutation(ctx, key, "title", path.clone(), unsaved, |title: &Option<String>| {
                    Value::from(title.clone())
                });
            let options = ctx
                .binding_options()
                .should_mutate(|title: &Option<String>| title.is_some())
                .additional_mutation(ctx.index_mutation(doc));
            let title: Box<dyn Binding> = Box::new(ThrottledReactiveBinding::scalar(
                format!("title:{key}"),
                doc.title_observable().clone(),
                mutation,
                options,
            ));

            let mutation = field_mutation(
                ctx,
                key,
                "properties",
                path,
                unsaved,
                |properties: &BTreeMap<String, String>| {
                    let map = properties.iter().map(|(k, v)| (k.clone(), Value::from(v.as_str())));
                    Value::Object(map.collect())
                },
            );
            let options = ctx.binding_options().additional_mutation(ctx.index_mutation(doc));
            let properties: Box<dyn Binding> = Box::new(ThrottledReactiveBinding::scalar(
                format!("properties:{key}"),
                doc.properties_observable().clone(),
                mutation,
                options,
            ));
            vec![title, properties]
        }
        _ => Vec::new(),
    }
}

/// Writes one metadata field, tracking whether its latest write landed.
fn field_mutation<T, F>(
    ctx: &SyncContext,
    key: &str,
    field: &'static str,
    path: String,
    unsaved: &UnsavedFields,
    to_value: F,
) -> RetryableMutation<T>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(&T) -> Value + Send + Sync + 'static,
{
    let (saved, failed) = (Arc::clone(unsaved), Arc::clone(unsaved));
    let doc_key = key.to_string();
    ctx.update_mutation_builder(&format!("{field}:{key}"), path, move |value: &T| {
        single(field, to_value(value))
    })
    .on_success(move |_| {
        saved.lock().unwrap_or_else(|e| e.into_inner()).remove(field);
    })
    .on_error(move |_, err| {
        warn!(key = %doc_key, field, error = %err, "failed to save document field");
        failed.lock().unwrap_or_else(|e| e.into_inner()).insert(field);
    })
    .build()
}

fn single(name: &str, value: Value) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(name.to_string(), value);
    fields
}

#[cfg(test)]
#[path = "facade_tests.rs"]
mod tests;
