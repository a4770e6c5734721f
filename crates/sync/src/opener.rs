// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Loading documents from the remote store.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures_util::future::try_join;
use serde_json::Value;
use tracing::{debug, warn};

use cs_core::records::{DocumentMetadataRecord, DocumentRecord};
use cs_core::{ContentStatus, Document, DocumentType, Visibility};

use crate::context::SyncContext;
use crate::error::Result;

/// Identifies a document to open, plus metadata already known from the
/// listing record that referenced it.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenRequest {
    pub key: String,
    pub doc_type: DocumentType,
    pub uid: String,
    pub group_id: Option<String>,
    pub section_id: Option<String>,
    pub visibility: Option<Visibility>,
    pub title: Option<String>,
    pub properties: Option<BTreeMap<String, String>>,
}

impl OpenRequest {
    pub fn new(key: impl Into<String>, doc_type: DocumentType, uid: impl Into<String>) -> Self {
        OpenRequest {
            key: key.into(),
            doc_type,
            uid: uid.into(),
            group_id: None,
            section_id: None,
            visibility: None,
            title: None,
            properties: None,
        }
    }

    pub fn group_id(mut self, group_id: Option<String>) -> Self {
        self.group_id = group_id;
        self
    }

    pub fn section_id(mut self, section_id: Option<String>) -> Self {
        self.section_id = section_id;
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.properties = Some(properties);
        self
    }
}

/// Parses a stored content string. `None` when no content was stored.
pub(crate) fn decode_content(raw: Option<&str>) -> Option<serde_json::Result<Value>> {
    raw.map(serde_json::from_str)
}

pub struct DocumentOpener {
    ctx: SyncContext,
}

impl DocumentOpener {
    pub fn new(ctx: SyncContext) -> Self {
        DocumentOpener { ctx }
    }

    /// Reads the content and metadata records and builds a document.
    ///
    /// Fails if either record is missing. Content that does not parse yields
    /// a document with empty content and [`ContentStatus::Error`].
    pub async fn open(&self, req: OpenRequest) -> Result<Arc<Document>> {
        let paths = &self.ctx.paths;
        let content_path = paths.user_document(&req.uid, &req.key);
        let metadata_path = paths.user_document_metadata(&req.uid, &req.key);

        let (content, metadata) =
            try_join(self.ctx.store.get(&content_path), self.ctx.store.get(&metadata_path)).await?;

        let Some(metadata) = metadata else {
            return Err(cs_core::Error::MetadataMissing {
                key: req.key,
                doc_type: req.doc_type.to_string(),
                uid: req.uid,
                path: metadata_path,
            }
            .into());
        };
        let Some(content) = content else {
            return Err(cs_core::Error::ContentMissing {
                key: req.key,
                doc_type: req.doc_type.to_string(),
                uid: req.uid,
                path: content_path,
            }
            .into());
        };

        let metadata: DocumentMetadataRecord = serde_json::from_value(metadata)?;
        let record: DocumentRecord = serde_json::from_value(content)?;

        let (tree, status) = match decode_content(record.content.as_deref()) {
            None => (Value::Object(Default::default()), ContentStatus::Valid),
            Some(Ok(tree)) => (tree, ContentStatus::Valid),
            Some(Err(e)) => {
                warn!(key = %req.key, uid = %req.uid, error = %e, "unreadable document content");
                (Value::Object(Default::default()), ContentStatus::Error)
            }
        };

        let mut doc = Document::new(&req.key, req.doc_type, &req.uid)
            .with_group_id(req.group_id)
            .with_section_id(req.section_id)
            .with_visibility(req.visibility.unwrap_or_default())
            .with_title(req.title.or(metadata.title))
            .with_properties(req.properties.unwrap_or(metadata.properties))
            .with_content(tree)
            .with_change_count(record.change_count.unwrap_or(0));
        if let Some(created_at) = metadata.created_at {
            doc = doc.with_created_at(created_at);
        }
        doc.set_content_status(status);

        debug!(key = %req.key, doc_type = %req.doc_type, uid = %req.uid, "opened document");
        Ok(Arc::new(doc))
    }

    /// Opens a document and adds it to the documents store. An already
    /// loaded document is returned as is.
    pub async fn open_into_store(&self, req: OpenRequest) -> Result<Arc<Document>> {
        if let Some(existing) = self.ctx.stores.documents.get_document(&req.key) {
            return Ok(existing);
        }
        let doc = self.open(req).await?;
        // Another open may have finished first.
        if let Some(existing) = self.ctx.stores.documents.get_document(doc.key()) {
            return Ok(existing);
        }
        self.ctx.stores.documents.add(Arc::clone(&doc));
        Ok(doc)
    }
}

#[cfg(test)]
#[path = "opener_tests.rs"]
mod tests;
