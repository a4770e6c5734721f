// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote path scheme.
//!
//! Class-scoped data lives under `{root}/classes/{classHash}`, offering-scoped
//! data under `{root}/offerings/{offeringId}`. Paths are `/`-separated with
//! no leading or trailing slash.

use crate::document::DocumentType;
use crate::user::User;

/// Replaces characters that are not allowed in remote keys.
pub fn escape_key(key: &str) -> String {
    key.chars().map(|c| if matches!(c, '.' | '$' | '[' | ']' | '#' | '/') { '_' } else { c }).collect()
}

/// Builds every remote path the sync layer reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathScheme {
    root: String,
    class_hash: String,
    offering_id: String,
}

impl PathScheme {
    pub fn new(root: &str, class_hash: &str, offering_id: &str) -> Self {
        PathScheme {
            root: root.trim_matches('/').to_string(),
            class_hash: escape_key(class_hash),
            offering_id: escape_key(offering_id),
        }
    }

    /// Root is `{mode}/portals/{portal}`, e.g. `authed/portals/learn_concord_org`.
    pub fn for_user(mode: &str, user: &User) -> Self {
        let root = format!("{}/portals/{}", mode.trim_matches('/'), escape_key(&user.portal));
        PathScheme::new(&root, &user.class_hash, &user.offering_id)
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    fn under_root(&self, rest: &str) -> String {
        if self.root.is_empty() {
            rest.to_string()
        } else {
            format!("{}/{}", self.root, rest)
        }
    }

    // Class scope

    pub fn class_root(&self) -> String {
        self.under_root(&format!("classes/{}", self.class_hash))
    }

    pub fn user(&self, uid: &str) -> String {
        format!("{}/users/{}", self.class_root(), escape_key(uid))
    }

    pub fn user_documents(&self, uid: &str) -> String {
        format!("{}/documents", self.user(uid))
    }

    /// Content record of a document.
    pub fn user_document(&self, uid: &str, key: &str) -> String {
        format!("{}/{}", self.user_documents(uid), escape_key(key))
    }

    pub fn user_document_metadata(&self, uid: &str, key: &str) -> String {
        format!("{}/documentMetadata/{}", self.user(uid), escape_key(key))
    }

    pub fn last_edited_at(&self, uid: &str, key: &str) -> String {
        format!("{}/lastEditedAt", self.user_document_metadata(uid, key))
    }

    pub fn user_personal_documents(&self, uid: &str) -> String {
        format!("{}/personalDocs", self.user(uid))
    }

    pub fn user_learning_logs(&self, uid: &str) -> String {
        format!("{}/learningLogs", self.user(uid))
    }

    pub fn latest_group_id(&self, uid: &str) -> String {
        format!("{}/latestGroupId", self.user(uid))
    }

    pub fn personal_publications(&self) -> String {
        format!("{}/personalPublications", self.class_root())
    }

    pub fn learning_log_publications(&self) -> String {
        format!("{}/learningLogPublications", self.class_root())
    }

    // Offering scope

    pub fn offering_root(&self) -> String {
        self.under_root(&format!("offerings/{}", self.offering_id))
    }

    pub fn offering_user(&self, uid: &str) -> String {
        format!("{}/users/{}", self.offering_root(), escape_key(uid))
    }

    pub fn offering_user_documents(&self, uid: &str) -> String {
        format!("{}/documents", self.offering_user(uid))
    }

    pub fn offering_user_document(&self, uid: &str, key: &str) -> String {
        format!("{}/{}", self.offering_user_documents(uid), escape_key(key))
    }

    pub fn offering_user_planning_documents(&self, uid: &str) -> String {
        format!("{}/planning", self.offering_user(uid))
    }

    pub fn offering_user_section_documents(&self, uid: &str) -> String {
        format!("{}/sectionDocuments", self.offering_user(uid))
    }

    pub fn section_document(&self, uid: &str, section_id: &str) -> String {
        format!("{}/{}", self.offering_user_section_documents(uid), escape_key(section_id))
    }

    pub fn exemplars(&self, uid: &str) -> String {
        format!("{}/exemplars", self.offering_user(uid))
    }

    pub fn groups(&self) -> String {
        format!("{}/groups", self.offering_root())
    }

    pub fn group(&self, group_id: &str) -> String {
        format!("{}/{}", self.groups(), escape_key(group_id))
    }

    pub fn group_user(&self, group_id: &str, uid: &str) -> String {
        format!("{}/users/{}", self.group(group_id), escape_key(uid))
    }

    pub fn problem_publications(&self) -> String {
        format!("{}/publications", self.offering_root())
    }

    pub fn comments(&self) -> String {
        format!("{}/commentaries/comments", self.offering_root())
    }

    pub fn document_comments(&self, doc_key: &str) -> String {
        format!("{}/{}", self.comments(), escape_key(doc_key))
    }

    pub fn stars(&self) -> String {
        format!("{}/commentaries/stars", self.offering_root())
    }

    pub fn document_stars(&self, doc_key: &str) -> String {
        format!("{}/{}", self.stars(), escape_key(doc_key))
    }

    // By document type

    /// Type-specific metadata record, for types that have one.
    pub fn typed_metadata(&self, uid: &str, doc_type: DocumentType, key: &str) -> Option<String> {
        let key = escape_key(key);
        match doc_type {
            DocumentType::Problem => Some(format!("{}/{}", self.offering_user_documents(uid), key)),
            DocumentType::Planning => {
                Some(format!("{}/{}", self.offering_user_planning_documents(uid), key))
            }
            DocumentType::Personal => Some(format!("{}/{}", self.user_personal_documents(uid), key)),
            DocumentType::LearningLog => Some(format!("{}/{}", self.user_learning_logs(uid), key)),
            _ => None,
        }
    }

    /// Where publications of the given type are listed.
    pub fn publications(&self, doc_type: DocumentType) -> Option<String> {
        match doc_type {
            DocumentType::ProblemPublication => Some(self.problem_publications()),
            DocumentType::PersonalPublication => Some(self.personal_publications()),
            DocumentType::LearningLogPublication => Some(self.learning_log_publications()),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
