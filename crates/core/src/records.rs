// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Stored record shapes.
//!
//! These mirror the JSON objects kept in the remote tree. Every record
//! carries a `version` string and a `self` block identifying where it lives.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::document::{DocumentType, Visibility};
use crate::group::GroupUserState;

/// Current record format version.
pub const RECORD_VERSION: &str = "1.0";

fn default_version() -> String {
    RECORD_VERSION.to_string()
}

/// Identity block stored under `self`. Which fields are present depends on
/// the record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSelf {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offering_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
}

/// Document content record: `classes/{c}/users/{uid}/documents/{key}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(rename = "self", default)]
    pub self_: RecordSelf,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    /// Serialized content tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_count: Option<u64>,
}

/// Type-independent metadata: `classes/{c}/users/{uid}/documentMetadata/{key}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadataRecord {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(rename = "self", default)]
    pub self_: RecordSelf,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

/// Offering-scoped metadata for problem, planning and section documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferingDocumentRecord {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(rename = "self", default)]
    pub self_: RecordSelf,
    pub document_key: String,
    #[serde(default)]
    pub visibility: Visibility,
}

/// Metadata for personal documents and learning logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDocumentRecord {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(rename = "self", default)]
    pub self_: RecordSelf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_document_key: Option<String>,
}

/// Group record: `offerings/{o}/groups/{g}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRecord {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(rename = "self", default)]
    pub self_: RecordSelf,
    #[serde(default)]
    pub users: BTreeMap<String, GroupUserRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupUserRecord {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(rename = "self", default)]
    pub self_: RecordSelf,
    #[serde(default)]
    pub connected_timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disconnected_timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<GroupUserState>,
}

/// Publication record listing the published document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationRecord {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(rename = "self", default)]
    pub self_: RecordSelf,
    pub document_key: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_document_key: Option<String>,
    /// Connection state of each group member at publish time.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub group_user_connections: BTreeMap<String, bool>,
}

/// `offerings/{o}/commentaries/stars/{docKey}/{starKey}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarRecord {
    pub uid: String,
    #[serde(default)]
    pub starred: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

/// `offerings/{o}/commentaries/comments/{docKey}/{commentKey}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    pub uid: String,
    #[serde(default)]
    pub name: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod tests;
