// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The top-level handle an application holds for one signed-in user.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use cs_core::records::{
    DocumentMetadataRecord, DocumentRecord, OfferingDocumentRecord, PublicationRecord, RecordSelf,
    UserDocumentRecord, RECORD_VERSION,
};
use cs_core::{Document, DocumentType, Stores, User, Visibility};
use cs_remote::{IndexRecord, MetadataIndex, RemoteStore, SqliteIndex};

use crate::config::SyncConfig;
use crate::context::SyncContext;
use crate::error::{Error, Result};
use crate::facade::DocumentSyncFacade;
use crate::membership::GroupMembership;
use crate::monitor::DocumentMonitorRegistry;
use crate::orchestrator::ListenerOrchestrator;

/// Wires the listeners, the monitor registry and group membership around
/// one [`SyncContext`].
pub struct SyncSession {
    ctx: SyncContext,
    registry: Arc<DocumentMonitorRegistry>,
    membership: Arc<GroupMembership>,
    orchestrator: ListenerOrchestrator,
}

impl SyncSession {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        index: Arc<dyn MetadataIndex>,
        user: User,
        config: SyncConfig,
    ) -> Self {
        let ctx = SyncContext::new(store, index, user, config);
        let registry = Arc::new(DocumentMonitorRegistry::new(ctx.clone()));
        let membership = Arc::new(GroupMembership::new(ctx.clone()));
        let orchestrator =
            ListenerOrchestrator::new(&ctx, Arc::clone(&registry), Arc::clone(&membership));
        SyncSession { ctx, registry, membership, orchestrator }
    }

    /// Builds a session whose metadata index lives at the configured path,
    /// or in memory when no path can be resolved.
    pub fn open(store: Arc<dyn RemoteStore>, user: User, config: SyncConfig) -> Result<Self> {
        let index = match config.resolved_index_path() {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                SqliteIndex::open(&path)?
            }
            None => SqliteIndex::open_in_memory()?,
        };
        Ok(Self::new(store, Arc::new(index), user, config))
    }

    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    pub fn stores(&self) -> &Arc<Stores> {
        &self.ctx.stores
    }

    pub fn registry(&self) -> &Arc<DocumentMonitorRegistry> {
        &self.registry
    }

    pub fn orchestrator(&self) -> &ListenerOrchestrator {
        &self.orchestrator
    }

    pub fn is_listening(&self) -> bool {
        self.orchestrator.is_listening()
    }

    pub async fn start(&self) -> Result<()> {
        self.orchestrator.start().await
    }

    pub async fn stop(&self) {
        self.orchestrator.stop().await;
    }

    /// A sync facade for an open document. Call
    /// [`attach`](DocumentSyncFacade::attach) to start syncing edits.
    pub fn facade(&self, doc: Arc<Document>, read_only: bool) -> DocumentSyncFacade {
        DocumentSyncFacade::new(self.ctx.clone(), Arc::clone(&self.registry), doc, read_only)
    }

    pub async fn join_group(&self, group_id: &str) -> Result<()> {
        self.membership.join_group(group_id).await
    }

    pub async fn leave_group(&self) -> Result<()> {
        self.membership.leave_group().await
    }

    pub async fn create_personal_document(&self, title: &str) -> Result<Arc<Document>> {
        self.create(DocumentType::Personal, Some(title.to_string())).await
    }

    pub async fn create_learning_log(&self, title: &str) -> Result<Arc<Document>> {
        self.create(DocumentType::LearningLog, Some(title.to_string())).await
    }

    /// Creates an empty document owned by the current user and adds it to
    /// the documents store.
    pub async fn create_document(&self, doc_type: DocumentType) -> Result<Arc<Document>> {
        self.create(doc_type, None).await
    }

    async fn create(&self, doc_type: DocumentType, title: Option<String>) -> Result<Arc<Document>> {
        if !matches!(
            doc_type,
            DocumentType::Problem
                | DocumentType::Planning
                | DocumentType::Personal
                | DocumentType::LearningLog
        ) {
            return Err(cs_core::Error::InvalidDocumentType(doc_type.to_string()).into());
        }
        let title = title.filter(|_| doc_type.has_user_metadata());
        let paths = &self.ctx.paths;
        let uid = self.ctx.uid();
        let key = self.ctx.store.push_key(&paths.user_documents(uid));
        let created_at = Utc::now().timestamp_millis();

        let mut writes = DocumentWrites::new(paths.root());
        writes.document(&self.ctx, &key, doc_type, "{}", created_at, title.clone())?;
        if let Some(typed) = paths.typed_metadata(uid, doc_type, &key) {
            if doc_type.has_user_metadata() {
                let record = UserDocumentRecord {
                    version: RECORD_VERSION.to_string(),
                    self_: self.identity(&key),
                    title: title.clone(),
                    properties: BTreeMap::new(),
                    original_document_key: None,
                };
                writes.add(&typed, &record)?;
            } else {
                let record = OfferingDocumentRecord {
                    version: RECORD_VERSION.to_string(),
                    self_: self.identity(&key),
                    document_key: key.clone(),
                    visibility: Visibility::Private,
                };
                writes.add(&typed, &record)?;
            }
        }
        writes.apply(self.ctx.store.as_ref()).await?;

        let doc = Arc::new(
            Document::new(&key, doc_type, uid)
                .with_created_at(created_at)
                .with_title(title)
                .with_content(Value::Object(Map::new())),
        );
        let record = IndexRecord::from_document(self.ctx.context_id(), &doc, Utc::now());
        self.ctx.index.upsert(&record)?;
        self.ctx.stores.documents.add(Arc::clone(&doc));
        info!(key = %key, doc_type = %doc_type, "created document");
        Ok(doc)
    }

    /// Publishes a snapshot of `doc` and returns the key of the published
    /// copy.
    ///
    /// Problem documents publish on behalf of the current group and record
    /// which members were connected at the time.
    pub async fn publish_document(&self, doc: &Document) -> Result<String> {
        let not_publishable = || Error::NotPublishable(doc.key().to_string());
        let pub_type = doc.doc_type().publication_type().ok_or_else(not_publishable)?;
        let list_path = self.ctx.paths.publications(pub_type).ok_or_else(not_publishable)?;
        let uid = self.ctx.uid();

        let group = if doc.doc_type() == DocumentType::Problem {
            let group = self
                .ctx
                .stores
                .groups
                .group_for_user(uid)
                .ok_or_else(|| Error::NoGroup(uid.to_string()))?;
            Some(group)
        } else {
            None
        };

        let key = self.ctx.store.push_key(&self.ctx.paths.user_documents(uid));
        let content = doc.serialize_content()?;
        let created_at = Utc::now().timestamp_millis();
        let pub_key = self.ctx.store.push_key(&list_path);

        let record = PublicationRecord {
            version: RECORD_VERSION.to_string(),
            self_: RecordSelf {
                uid: Some(uid.to_string()),
                class_hash: Some(self.ctx.user().class_hash.clone()),
                offering_id: (pub_type == DocumentType::ProblemPublication)
                    .then(|| self.ctx.user().offering_id.clone()),
                ..RecordSelf::default()
            },
            document_key: key.clone(),
            user_id: uid.to_string(),
            group_id: group.as_ref().map(|g| g.id.clone()),
            section_id: doc.section_id().map(str::to_string),
            title: doc.title(),
            original_document_key: Some(doc.key().to_string()),
            group_user_connections: group
                .iter()
                .flat_map(|g| &g.users)
                .map(|user| (user.id.clone(), user.is_connected()))
                .collect(),
        };

        let mut writes = DocumentWrites::new(self.ctx.paths.root());
        writes.document(&self.ctx, &key, pub_type, &content, created_at, doc.title())?;
        writes.add(&format!("{list_path}/{pub_key}"), &record)?;
        writes.apply(self.ctx.store.as_ref()).await?;

        info!(key = %doc.key(), published = %key, doc_type = %pub_type, "published document");
        Ok(key)
    }

    fn identity(&self, key: &str) -> RecordSelf {
        RecordSelf {
            uid: Some(self.ctx.uid().to_string()),
            document_key: Some(key.to_string()),
            class_hash: Some(self.ctx.user().class_hash.clone()),
            offering_id: Some(self.ctx.user().offering_id.clone()),
            ..RecordSelf::default()
        }
    }
}

/// Records written together in one multi-path update under the store root.
struct DocumentWrites<'a> {
    root: &'a str,
    fields: Map<String, Value>,
}

impl<'a> DocumentWrites<'a> {
    fn new(root: &'a str) -> Self {
        DocumentWrites { root, fields: Map::new() }
    }

    fn add(&mut self, path: &str, record: &impl Serialize) -> Result<()> {
        let relative = if self.root.is_empty() {
            Some(path)
        } else {
            path.strip_prefix(self.root).and_then(|rest| rest.strip_prefix('/'))
        };
        let relative = relative.ok_or_else(|| cs_core::Error::InvalidPath(path.to_string()))?;
        self.fields.insert(relative.to_string(), serde_json::to_value(record)?);
        Ok(())
    }

    /// Content and metadata records of a new document.
    fn document(
        &mut self,
        ctx: &SyncContext,
        key: &str,
        doc_type: DocumentType,
        content: &str,
        created_at: i64,
        title: Option<String>,
    ) -> Result<()> {
        let uid = ctx.uid();
        let self_ = RecordSelf {
            uid: Some(uid.to_string()),
            document_key: Some(key.to_string()),
            ..RecordSelf::default()
        };
        let content = DocumentRecord {
            version: RECORD_VERSION.to_string(),
            self_: self_.clone(),
            doc_type,
            content: Some(content.to_string()),
            change_count: Some(0),
        };
        let metadata = DocumentMetadataRecord {
            version: RECORD_VERSION.to_string(),
            self_,
            doc_type,
            created_at: Some(created_at),
            last_edited_at: None,
            title,
            properties: BTreeMap::new(),
        };
        self.add(&ctx.paths.user_document(uid, key), &content)?;
        self.add(&ctx.paths.user_document_metadata(uid, key), &metadata)
    }

    async fn apply(self, store: &dyn RemoteStore) -> Result<()> {
        debug!(records = self.fields.len(), "writing document records");
        store.update(self.root, self.fields).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
