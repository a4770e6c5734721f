// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Document model.
//!
//! A [`Document`] carries immutable identity (key, type, owner) plus
//! observable fields that the sync layer either watches for local edits or
//! overwrites from the remote store. Documents are shared as
//! `Arc<Document>` between the stores, the monitor registry and any open
//! editing session.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::observable::Observable;

/// Classification of documents by purpose and owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentType {
    /// Student work on the current problem.
    Problem,
    /// Teacher planning notes for a problem.
    Planning,
    /// Free-form personal workspace.
    Personal,
    /// Running learning log.
    LearningLog,
    /// Published snapshot of a problem document.
    #[serde(rename = "publication")]
    ProblemPublication,
    /// Published snapshot of a personal document.
    PersonalPublication,
    /// Published snapshot of a learning log.
    LearningLogPublication,
    /// Document shared by a group.
    Group,
}

impl DocumentType {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Problem => "problem",
            DocumentType::Planning => "planning",
            DocumentType::Personal => "personal",
            DocumentType::LearningLog => "learningLog",
            DocumentType::ProblemPublication => "publication",
            DocumentType::PersonalPublication => "personalPublication",
            DocumentType::LearningLogPublication => "learningLogPublication",
            DocumentType::Group => "group",
        }
    }

    pub fn is_publication(&self) -> bool {
        matches!(
            self,
            DocumentType::ProblemPublication
                | DocumentType::PersonalPublication
                | DocumentType::LearningLogPublication
        )
    }

    /// Problem and planning documents are scoped to an offering.
    pub fn is_offering_scoped(&self) -> bool {
        matches!(self, DocumentType::Problem | DocumentType::Planning)
    }

    /// Personal documents and learning logs carry a user-editable title
    /// and properties.
    pub fn has_user_metadata(&self) -> bool {
        matches!(self, DocumentType::Personal | DocumentType::LearningLog)
    }

    /// The publication type a document of this type publishes as.
    pub fn publication_type(&self) -> Option<DocumentType> {
        match self {
            DocumentType::Problem => Some(DocumentType::ProblemPublication),
            DocumentType::Personal => Some(DocumentType::PersonalPublication),
            DocumentType::LearningLog => Some(DocumentType::LearningLogPublication),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "problem" => Ok(DocumentType::Problem),
            "planning" => Ok(DocumentType::Planning),
            "personal" => Ok(DocumentType::Personal),
            "learningLog" => Ok(DocumentType::LearningLog),
            "publication" => Ok(DocumentType::ProblemPublication),
            "personalPublication" => Ok(DocumentType::PersonalPublication),
            "learningLogPublication" => Ok(DocumentType::LearningLogPublication),
            "group" => Ok(DocumentType::Group),
            _ => Err(Error::InvalidDocumentType(s.to_string())),
        }
    }
}

/// Who may see a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Public,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Public => "public",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "private" => Ok(Visibility::Private),
            "public" => Ok(Visibility::Public),
            _ => Err(Error::InvalidVisibility(s.to_string())),
        }
    }
}

/// Direction of synchronization for a document.
///
/// A document is in at most one mode at a time: either its local edits are
/// written out, or remote changes are written in, never both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorMode {
    /// Not synchronized.
    #[default]
    None,
    /// Local edits are written to the remote store.
    Local,
    /// Remote changes overwrite local content.
    Remote,
}

impl fmt::Display for MonitorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MonitorMode::None => "none",
            MonitorMode::Local => "local",
            MonitorMode::Remote => "remote",
        };
        write!(f, "{s}")
    }
}

/// Whether the last content received could be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentStatus {
    #[default]
    Valid,
    Error,
}

/// A unit of user-authored content.
pub struct Document {
    key: String,
    doc_type: DocumentType,
    uid: String,
    created_at: Option<i64>,
    group_id: Option<String>,
    section_id: Option<String>,
    visibility: Observable<Visibility>,
    title: Observable<Option<String>>,
    properties: Observable<BTreeMap<String, String>>,
    content: Observable<Value>,
    change_count: AtomicU64,
    content_status: Mutex<ContentStatus>,
    monitor: Mutex<MonitorMode>,
}

impl Document {
    pub fn new(key: impl Into<String>, doc_type: DocumentType, uid: impl Into<String>) -> Self {
        Document {
            key: key.into(),
            doc_type,
            uid: uid.into(),
            created_at: None,
            group_id: None,
            section_id: None,
            visibility: Observable::new(Visibility::Private),
            title: Observable::new(None),
            properties: Observable::new(BTreeMap::new()),
            content: Observable::new(Value::Object(Default::default())),
            change_count: AtomicU64::new(0),
            content_status: Mutex::new(ContentStatus::Valid),
            monitor: Mutex::new(MonitorMode::None),
        }
    }

    pub fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_group_id(mut self, group_id: Option<String>) -> Self {
        self.group_id = group_id;
        self
    }

    pub fn with_section_id(mut self, section_id: Option<String>) -> Self {
        self.section_id = section_id;
        self
    }

    pub fn with_visibility(self, visibility: Visibility) -> Self {
        self.visibility.set(visibility);
        self
    }

    pub fn with_title(self, title: Option<String>) -> Self {
        self.title.set(title);
        self
    }

    pub fn with_properties(self, properties: BTreeMap<String, String>) -> Self {
        self.properties.set(properties);
        self
    }

    pub fn with_content(self, content: Value) -> Self {
        self.content.set(content);
        self
    }

    pub fn with_change_count(self, count: u64) -> Self {
        self.change_count.store(count, Ordering::SeqCst);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn doc_type(&self) -> DocumentType {
        self.doc_type
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn created_at(&self) -> Option<i64> {
        self.created_at
    }

    pub fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }

    pub fn section_id(&self) -> Option<&str> {
        self.section_id.as_deref()
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility.get()
    }

    pub fn set_visibility(&self, visibility: Visibility) -> bool {
        self.visibility.set(visibility)
    }

    pub fn visibility_observable(&self) -> &Observable<Visibility> {
        &self.visibility
    }

    pub fn title(&self) -> Option<String> {
        self.title.get()
    }

    pub fn set_title(&self, title: impl Into<String>) -> bool {
        self.title.set(Some(title.into()))
    }

    pub fn title_observable(&self) -> &Observable<Option<String>> {
        &self.title
    }

    pub fn properties(&self) -> BTreeMap<String, String> {
        self.properties.get()
    }

    pub fn property(&self, name: &str) -> Option<String> {
        self.properties.with(|props| props.get(name).cloned())
    }

    pub fn set_property(&self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let (name, value) = (name.into(), value.into());
        self.properties.update(|props| {
            props.insert(name, value);
        })
    }

    pub fn remove_property(&self, name: &str) -> bool {
        self.properties.update(|props| {
            props.remove(name);
        })
    }

    pub fn set_properties(&self, properties: BTreeMap<String, String>) -> bool {
        self.properties.set(properties)
    }

    pub fn properties_observable(&self) -> &Observable<BTreeMap<String, String>> {
        &self.properties
    }

    pub fn content(&self) -> Value {
        self.content.get()
    }

    pub fn set_content(&self, content: Value) -> bool {
        self.content.set(content)
    }

    pub fn content_observable(&self) -> &Observable<Value> {
        &self.content
    }

    /// Serializes the content tree to its stored string form.
    pub fn serialize_content(&self) -> Result<String> {
        self.content.with(|content| serde_json::to_string(content)).map_err(Error::from)
    }

    pub fn change_count(&self) -> u64 {
        self.change_count.load(Ordering::SeqCst)
    }

    /// Bumps the change counter and returns the new value.
    pub fn increment_change_count(&self) -> u64 {
        self.change_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn set_change_count(&self, count: u64) {
        self.change_count.store(count, Ordering::SeqCst);
    }

    pub fn content_status(&self) -> ContentStatus {
        *self.content_status.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_content_status(&self, status: ContentStatus) {
        *self.content_status.lock().unwrap_or_else(|e| e.into_inner()) = status;
    }

    pub fn monitor_mode(&self) -> MonitorMode {
        *self.monitor.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_monitor_mode(&self, mode: MonitorMode) {
        *self.monitor.lock().unwrap_or_else(|e| e.into_inner()) = mode;
    }

    /// Publications and other users' documents are read-only here.
    pub fn is_editable_by(&self, uid: &str) -> bool {
        !self.doc_type.is_publication() && self.uid == uid
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("key", &self.key)
            .field("type", &self.doc_type)
            .field("uid", &self.uid)
            .field("visibility", &self.visibility())
            .field("title", &self.title())
            .field("change_count", &self.change_count())
            .field("monitor", &self.monitor_mode())
            .finish()
    }
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
