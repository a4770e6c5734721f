// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::error::Error;
use crate::test_helpers::{context, seed_document, student};
use serde_json::json;

#[tokio::test]
async fn open_reads_content_and_metadata() {
    let (ctx, store) = context(student("u1"));
    seed_document(&store, &ctx, "u1", "d1", DocumentType::Personal, json!({"tiles": [1]}));
    store.server_set(&format!("{}/title", ctx.paths.user_document_metadata("u1", "d1")), json!("Mine"));

    let doc = DocumentOpener::new(ctx).open(OpenRequest::new("d1", DocumentType::Personal, "u1")).await.unwrap();

    assert_eq!(doc.content(), json!({"tiles": [1]}));
    assert_eq!(doc.title().as_deref(), Some("Mine"));
    assert_eq!(doc.created_at(), Some(100));
    assert_eq!(doc.content_status(), ContentStatus::Valid);
}

#[tokio::test]
async fn listing_metadata_overrides_stored_title() {
    let (ctx, store) = context(student("u1"));
    seed_document(&store, &ctx, "u1", "d1", DocumentType::Problem, json!({}));

    let req = OpenRequest::new("d1", DocumentType::Problem, "u1")
        .title(Some("From listing".into()))
        .visibility(Visibility::Public)
        .group_id(Some("g1".into()));
    let doc = DocumentOpener::new(ctx).open(req).await.unwrap();

    assert_eq!(doc.title().as_deref(), Some("From listing"));
    assert_eq!(doc.visibility(), Visibility::Public);
    assert_eq!(doc.group_id(), Some("g1"));
}

#[tokio::test]
async fn missing_metadata_names_the_document() {
    let (ctx, store) = context(student("u1"));
    store.server_set(&ctx.paths.user_document("u1", "d1"), json!({"type": "problem", "content": "{}"}));

    let err = DocumentOpener::new(ctx)
        .open(OpenRequest::new("d1", DocumentType::Problem, "u1"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Core(cs_core::Error::MetadataMissing { .. })));
    assert!(err.to_string().contains("d1"));
}

#[tokio::test]
async fn missing_content_is_an_error() {
    let (ctx, store) = context(student("u1"));
    store.server_set(&ctx.paths.user_document_metadata("u1", "d1"), json!({"type": "problem"}));

    let err = DocumentOpener::new(ctx)
        .open(OpenRequest::new("d1", DocumentType::Problem, "u1"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Core(cs_core::Error::ContentMissing { .. })));
}

#[tokio::test]
async fn unreadable_content_marks_status() {
    let (ctx, store) = context(student("u1"));
    seed_document(&store, &ctx, "u1", "d1", DocumentType::Problem, json!({}));
    store.server_set(&format!("{}/content", ctx.paths.user_document("u1", "d1")), json!("{not json"));

    let doc = DocumentOpener::new(ctx).open(OpenRequest::new("d1", DocumentType::Problem, "u1")).await.unwrap();

    assert_eq!(doc.content_status(), ContentStatus::Error);
    assert_eq!(doc.content(), json!({}));
}

#[tokio::test]
async fn open_into_store_reuses_loaded_document() {
    let (ctx, store) = context(student("u1"));
    seed_document(&store, &ctx, "u1", "d1", DocumentType::Problem, json!({}));
    let opener = DocumentOpener::new(ctx.clone());

    let first = opener.open_into_store(OpenRequest::new("d1", DocumentType::Problem, "u1")).await.unwrap();
    let second = opener.open_into_store(OpenRequest::new("d1", DocumentType::Problem, "u1")).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(ctx.stores.documents.len(), 1);
}

#[tokio::test]
async fn offline_open_fails_transiently() {
    let (ctx, store) = context(student("u1"));
    seed_document(&store, &ctx, "u1", "d1", DocumentType::Problem, json!({}));
    store.set_connected(false);

    let err = DocumentOpener::new(ctx)
        .open(OpenRequest::new("d1", DocumentType::Problem, "u1"))
        .await
        .unwrap_err();

    assert!(err.is_transient());
}
