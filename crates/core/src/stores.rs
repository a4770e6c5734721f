// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory stores kept current by the sync listeners.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use crate::document::{Document, DocumentType};
use crate::group::Group;
use crate::observable::{Disposer, Observable};
use crate::user::User;

/// Every store the sync layer reads and writes, plus the current user.
pub struct Stores {
    pub user: User,
    pub documents: DocumentsStore,
    pub groups: GroupsStore,
    pub latest_group_id: Observable<Option<String>>,
    pub stars: StarsStore,
    pub comments: CommentsStore,
    pub exemplars: ExemplarsStore,
}

impl Stores {
    pub fn new(user: User) -> Self {
        Stores {
            user,
            documents: DocumentsStore::default(),
            groups: GroupsStore::default(),
            latest_group_id: Observable::new(None),
            stars: StarsStore::default(),
            comments: CommentsStore::default(),
            exemplars: ExemplarsStore::default(),
        }
    }
}

/// Open documents keyed by document key.
#[derive(Default)]
pub struct DocumentsStore {
    documents: Mutex<BTreeMap<String, Arc<Document>>>,
}

impl DocumentsStore {
    /// Adds a document, returning any document it replaced.
    pub fn add(&self, doc: Arc<Document>) -> Option<Arc<Document>> {
        let key = doc.key().to_string();
        self.documents.lock().unwrap_or_else(|e| e.into_inner()).insert(key, doc)
    }

    pub fn get_document(&self, key: &str) -> Option<Arc<Document>> {
        self.documents.lock().unwrap_or_else(|e| e.into_inner()).get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.documents.lock().unwrap_or_else(|e| e.into_inner()).contains_key(key)
    }

    pub fn remove(&self, key: &str) -> Option<Arc<Document>> {
        self.documents.lock().unwrap_or_else(|e| e.into_inner()).remove(key)
    }

    pub fn len(&self) -> usize {
        self.documents.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn all(&self) -> Vec<Arc<Document>> {
        self.documents.lock().unwrap_or_else(|e| e.into_inner()).values().cloned().collect()
    }

    pub fn by_type(&self, doc_type: DocumentType) -> Vec<Arc<Document>> {
        self.filter(|doc| doc.doc_type() == doc_type)
    }

    pub fn by_uid(&self, uid: &str) -> Vec<Arc<Document>> {
        self.filter(|doc| doc.uid() == uid)
    }

    fn filter(&self, pred: impl Fn(&Document) -> bool) -> Vec<Arc<Document>> {
        self.documents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|doc| pred(doc))
            .cloned()
            .collect()
    }
}

/// Resolved group membership for the offering.
#[derive(Default)]
pub struct GroupsStore {
    groups: Observable<Vec<Group>>,
}

impl GroupsStore {
    /// Replaces all groups. Returns false if nothing changed.
    pub fn set_groups(&self, groups: Vec<Group>) -> bool {
        self.groups.set(groups)
    }

    pub fn groups(&self) -> Vec<Group> {
        self.groups.get()
    }

    pub fn group(&self, id: &str) -> Option<Group> {
        self.groups.with(|groups| groups.iter().find(|g| g.id == id).cloned())
    }

    pub fn group_for_user(&self, uid: &str) -> Option<Group> {
        self.groups.with(|groups| groups.iter().find(|g| g.contains(uid)).cloned())
    }

    /// Other members of the user's group.
    pub fn groupmates(&self, uid: &str) -> BTreeSet<String> {
        self.group_for_user(uid)
            .map(|g| g.users.into_iter().map(|u| u.id).filter(|id| id != uid).collect())
            .unwrap_or_default()
    }

    pub fn all_user_ids(&self) -> BTreeSet<String> {
        self.groups.with(|groups| {
            groups.iter().flat_map(|g| g.users.iter().map(|u| u.id.clone())).collect()
        })
    }

    pub fn subscribe(&self, observer: impl Fn(&Vec<Group>) + Send + Sync + 'static) -> Disposer {
        self.groups.subscribe(observer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Star {
    pub key: String,
    pub doc_key: String,
    pub uid: String,
    pub starred: bool,
    pub created_at: Option<i64>,
}

/// Stars keyed by starred document.
#[derive(Default)]
pub struct StarsStore {
    stars: Mutex<BTreeMap<String, Vec<Star>>>,
}

impl StarsStore {
    pub fn replace_all(&self, stars: BTreeMap<String, Vec<Star>>) {
        *self.stars.lock().unwrap_or_else(|e| e.into_inner()) = stars;
    }

    pub fn stars_for(&self, doc_key: &str) -> Vec<Star> {
        self.stars.lock().unwrap_or_else(|e| e.into_inner()).get(doc_key).cloned().unwrap_or_default()
    }

    pub fn is_starred_by(&self, doc_key: &str, uid: &str) -> bool {
        self.stars_for(doc_key).iter().any(|s| s.uid == uid && s.starred)
    }

    pub fn star_count(&self, doc_key: &str) -> usize {
        self.stars_for(doc_key).iter().filter(|s| s.starred).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub key: String,
    pub doc_key: String,
    pub uid: String,
    pub name: String,
    pub content: String,
    pub tile_id: Option<String>,
    pub created_at: Option<i64>,
}

/// Comment threads keyed by document.
#[derive(Default)]
pub struct CommentsStore {
    comments: Mutex<BTreeMap<String, Vec<Comment>>>,
}

impl CommentsStore {
    /// Replaces a document's thread, oldest first.
    pub fn set_document_comments(&self, doc_key: &str, mut comments: Vec<Comment>) {
        comments.sort_by_key(|c| c.created_at.unwrap_or(i64::MAX));
        self.comments.lock().unwrap_or_else(|e| e.into_inner()).insert(doc_key.to_string(), comments);
    }

    pub fn remove_document(&self, doc_key: &str) {
        self.comments.lock().unwrap_or_else(|e| e.into_inner()).remove(doc_key);
    }

    pub fn comments_for(&self, doc_key: &str) -> Vec<Comment> {
        self.comments
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(doc_key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn document_count(&self) -> usize {
        self.comments.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Keys of exemplar documents made visible to the user.
#[derive(Default)]
pub struct ExemplarsStore {
    visible: Mutex<BTreeSet<String>>,
}

impl ExemplarsStore {
    pub fn replace_all(&self, keys: BTreeSet<String>) {
        *self.visible.lock().unwrap_or_else(|e| e.into_inner()) = keys;
    }

    pub fn set_visible(&self, key: &str, visible: bool) {
        let mut keys = self.visible.lock().unwrap_or_else(|e| e.into_inner());
        if visible {
            keys.insert(key.to_string());
        } else {
            keys.remove(key);
        }
    }

    pub fn is_visible(&self, key: &str) -> bool {
        self.visible.lock().unwrap_or_else(|e| e.into_inner()).contains(key)
    }

    pub fn visible(&self) -> Vec<String> {
        self.visible.lock().unwrap_or_else(|e| e.into_inner()).iter().cloned().collect()
    }
}

#[cfg(test)]
#[path = "stores_tests.rs"]
mod tests;
