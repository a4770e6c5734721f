// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared handles passed to every sync component.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};

use cs_core::{Document, PathScheme, Stores, User};
use cs_remote::{IndexRecord, MetadataIndex, RemoteStore};

use crate::binding::BindingOptions;
use crate::config::SyncConfig;
use crate::mutation::{MutationBuilder, RetryPolicy, RetryableMutation, WriteFuture};

/// Everything a listener, binding or facade needs to reach the remote
/// store and the local stores. Cheap to clone.
#[derive(Clone)]
pub struct SyncContext {
    pub store: Arc<dyn RemoteStore>,
    pub index: Arc<dyn MetadataIndex>,
    pub paths: PathScheme,
    pub stores: Arc<Stores>,
    pub config: Arc<SyncConfig>,
}

impl SyncContext {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        index: Arc<dyn MetadataIndex>,
        user: User,
        config: SyncConfig,
    ) -> Self {
        let paths = PathScheme::for_user(&config.app_mode, &user);
        SyncContext {
            store,
            index,
            paths,
            stores: Arc::new(Stores::new(user)),
            config: Arc::new(config),
        }
    }

    pub fn user(&self) -> &User {
        &self.stores.user
    }

    pub fn uid(&self) -> &str {
        &self.stores.user.id
    }

    /// Index partition for this class.
    pub fn context_id(&self) -> &str {
        &self.stores.user.class_hash
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.config.retry)
    }

    pub fn binding_options<T>(&self) -> BindingOptions<T> {
        BindingOptions::new(self.config.throttle()).debug_save(self.config.debug_save)
    }

    /// A mutation that merges `fields(value)` into the record at `path`.
    pub fn update_mutation<T, F>(&self, name: &str, path: String, fields: F) -> RetryableMutation<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(&T) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.update_mutation_builder(name, path, fields).build()
    }

    /// Like [`update_mutation`](Self::update_mutation), leaving the hooks to
    /// the caller.
    pub fn update_mutation_builder<T, F>(
        &self,
        name: &str,
        path: String,
        fields: F,
    ) -> MutationBuilder<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(&T) -> Map<String, Value> + Send + Sync + 'static,
    {
        let store = Arc::clone(&self.store);
        let executor = Arc::new(move |value: T| {
            let store = Arc::clone(&store);
            let path = path.clone();
            let fields = fields(&value);
            Box::pin(async move { store.update(&path, fields).await }) as WriteFuture
        });
        RetryableMutation::builder(name, executor).policy(self.retry_policy())
    }

    /// A mutation that mirrors the document's current metadata into the
    /// index, whatever value it is submitted with.
    pub fn index_mutation<T>(&self, doc: &Arc<Document>) -> RetryableMutation<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let name = format!("index:{}", doc.key());
        let index = Arc::clone(&self.index);
        let doc = Arc::clone(doc);
        let context_id = self.context_id().to_string();
        let executor = Arc::new(move |_value: T| {
            let record = IndexRecord::from_document(&context_id, &doc, Utc::now());
            let index = Arc::clone(&index);
            Box::pin(async move { index.upsert(&record) }) as WriteFuture
        });
        RetryableMutation::builder(name, executor).policy(self.retry_policy()).build()
    }
}
