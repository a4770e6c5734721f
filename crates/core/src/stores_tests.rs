// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::group::GroupUser;
use std::sync::atomic::{AtomicUsize, Ordering};

fn doc(key: &str, doc_type: DocumentType, uid: &str) -> Arc<Document> {
    Arc::new(Document::new(key, doc_type, uid))
}

#[test]
fn documents_add_get_remove() {
    let store = DocumentsStore::default();
    assert!(store.add(doc("d1", DocumentType::Problem, "u1")).is_none());
    assert!(store.add(doc("d1", DocumentType::Problem, "u1")).is_some());
    assert_eq!(store.len(), 1);
    assert!(store.get_document("d1").is_some());
    assert!(store.remove("d1").is_some());
    assert!(store.is_empty());
}

#[test]
fn documents_filter_by_type_and_uid() {
    let store = DocumentsStore::default();
    store.add(doc("d1", DocumentType::Problem, "u1"));
    store.add(doc("d2", DocumentType::Personal, "u1"));
    store.add(doc("d3", DocumentType::Problem, "u2"));

    assert_eq!(store.by_type(DocumentType::Problem).len(), 2);
    assert_eq!(store.by_uid("u1").len(), 2);
}

#[test]
fn groups_lookup_and_groupmates() {
    let store = GroupsStore::default();
    store.set_groups(vec![
        Group::new("g1", vec![GroupUser::new("u1", 1), GroupUser::new("u2", 2)]),
        Group::new("g2", vec![GroupUser::new("u3", 3)]),
    ]);

    assert_eq!(store.group_for_user("u2").unwrap().id, "g1");
    assert_eq!(store.groupmates("u1").into_iter().collect::<Vec<_>>(), vec!["u2"]);
    assert!(store.groupmates("u9").is_empty());
    assert_eq!(store.all_user_ids().len(), 3);
}

#[test]
fn groups_notify_only_on_change() {
    let store = GroupsStore::default();
    let hits = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&hits);
    let _sub = store.subscribe(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let groups = vec![Group::new("g1", vec![GroupUser::new("u1", 1)])];
    assert!(store.set_groups(groups.clone()));
    assert!(!store.set_groups(groups));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn stars_count_only_starred() {
    let store = StarsStore::default();
    let star = |key: &str, uid: &str, starred: bool| Star {
        key: key.into(),
        doc_key: "d1".into(),
        uid: uid.into(),
        starred,
        created_at: None,
    };
    store.replace_all(BTreeMap::from([(
        "d1".to_string(),
        vec![star("s1", "u1", true), star("s2", "u2", false)],
    )]));

    assert_eq!(store.star_count("d1"), 1);
    assert!(store.is_starred_by("d1", "u1"));
    assert!(!store.is_starred_by("d1", "u2"));
    assert_eq!(store.star_count("missing"), 0);
}

#[test]
fn comments_sorted_oldest_first() {
    let store = CommentsStore::default();
    let comment = |key: &str, at: i64| Comment {
        key: key.into(),
        doc_key: "d1".into(),
        uid: "u1".into(),
        name: "Ada".into(),
        content: "hi".into(),
        tile_id: None,
        created_at: Some(at),
    };
    store.set_document_comments("d1", vec![comment("c2", 20), comment("c1", 10)]);

    let keys: Vec<_> = store.comments_for("d1").into_iter().map(|c| c.key).collect();
    assert_eq!(keys, vec!["c1", "c2"]);

    store.remove_document("d1");
    assert_eq!(store.document_count(), 0);
}

#[test]
fn exemplars_toggle_visibility() {
    let store = ExemplarsStore::default();
    store.set_visible("e1", true);
    store.set_visible("e2", true);
    store.set_visible("e1", false);
    assert_eq!(store.visible(), vec!["e2"]);
    assert!(!store.is_visible("e1"));
}
