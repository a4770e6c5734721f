// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use chrono::TimeZone;

fn record(key: &str, uid: &str, doc_type: DocumentType) -> IndexRecord {
    IndexRecord {
        context_id: "class1".into(),
        document_key: key.into(),
        uid: uid.into(),
        doc_type,
        visibility: Visibility::Private,
        title: None,
        properties: BTreeMap::new(),
        created_at: Some(1),
        updated_at: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
    }
}

#[test]
fn upsert_and_get() {
    let index = SqliteIndex::open_in_memory().unwrap();
    let mut rec = record("d1", "u1", DocumentType::Personal);
    rec.title = Some("Notes".into());
    rec.properties.insert("color".into(), "red".into());
    index.upsert(&rec).unwrap();

    let loaded = index.get("class1", "d1").unwrap().unwrap();
    assert_eq!(loaded, rec);
    assert!(index.get("class2", "d1").unwrap().is_none());
}

#[test]
fn upsert_replaces_title_and_properties() {
    let index = SqliteIndex::open_in_memory().unwrap();
    let mut rec = record("d1", "u1", DocumentType::Personal);
    rec.properties.insert("color".into(), "red".into());
    index.upsert(&rec).unwrap();

    rec.title = Some("Renamed".into());
    rec.properties = BTreeMap::from([("size".to_string(), "large".to_string())]);
    rec.created_at = None;
    index.upsert(&rec).unwrap();

    let loaded = index.get("class1", "d1").unwrap().unwrap();
    assert_eq!(loaded.title.as_deref(), Some("Renamed"));
    assert_eq!(loaded.properties.len(), 1);
    assert_eq!(loaded.properties["size"], "large");
    assert_eq!(loaded.created_at, Some(1));
}

#[test]
fn queries_filter_by_context() {
    let index = SqliteIndex::open_in_memory().unwrap();
    index.upsert(&record("d1", "u1", DocumentType::Personal)).unwrap();
    index.upsert(&record("d2", "u1", DocumentType::LearningLog)).unwrap();
    index.upsert(&record("d3", "u2", DocumentType::Personal)).unwrap();
    index
        .upsert(&IndexRecord { context_id: "class2".into(), ..record("d4", "u1", DocumentType::Personal) })
        .unwrap();

    let personal = index.documents_of_type("class1", DocumentType::Personal).unwrap();
    assert_eq!(personal.iter().map(|r| r.document_key.as_str()).collect::<Vec<_>>(), vec!["d1", "d3"]);
    assert_eq!(index.documents_for_user("class1", "u1").unwrap().len(), 2);
}

#[test]
fn property_query_matches_name_and_value() {
    let index = SqliteIndex::open_in_memory().unwrap();
    let mut starred = record("d1", "u1", DocumentType::Personal);
    starred.properties.insert("starred".into(), "true".into());
    let mut unstarred = record("d2", "u1", DocumentType::Personal);
    unstarred.properties.insert("starred".into(), "false".into());
    index.upsert(&starred).unwrap();
    index.upsert(&unstarred).unwrap();

    let found = index.documents_with_property("class1", "starred", "true").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].document_key, "d1");
    assert_eq!(found[0].properties["starred"], "true");
}

#[test]
fn remove_cascades_properties() {
    let index = SqliteIndex::open_in_memory().unwrap();
    let mut rec = record("d1", "u1", DocumentType::Personal);
    rec.properties.insert("color".into(), "red".into());
    index.upsert(&rec).unwrap();

    assert!(index.remove("class1", "d1").unwrap());
    assert!(!index.remove("class1", "d1").unwrap());
    assert!(index.documents_with_property("class1", "color", "red").unwrap().is_empty());
}

#[test]
fn from_document_snapshots_metadata() {
    let doc = Document::new("d1", DocumentType::LearningLog, "u1")
        .with_title(Some("Log".into()))
        .with_created_at(7);
    doc.set_property("unit", "2");
    let now = Utc::now();

    let rec = IndexRecord::from_document("class1", &doc, now);
    assert_eq!(rec.title.as_deref(), Some("Log"));
    assert_eq!(rec.properties["unit"], "2");
    assert_eq!(rec.created_at, Some(7));
    assert_eq!(rec.updated_at, now);
}

#[test]
fn open_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("index.db");
    let index = SqliteIndex::open(&path).unwrap();
    index.upsert(&record("d1", "u1", DocumentType::Problem)).unwrap();
    assert!(path.exists());
}
