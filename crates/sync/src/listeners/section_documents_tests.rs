// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::test_helpers::{advance, context, seed_document, student};
use serde_json::json;

#[tokio::test(start_paused = true)]
async fn loads_section_documents() {
    let (ctx, store) = context(student("u1"));
    seed_document(&store, &ctx, "u1", "s-doc", DocumentType::Problem, json!({}));
    seed_document(&store, &ctx, "u1", "s-doc2", DocumentType::Problem, json!({}));
    store.server_set(&ctx.paths.section_document("u1", "intro"), json!({"documentKey": "s-doc"}));
    let listener = SectionDocumentsListener::new(ctx.clone());

    listener.start().await.unwrap();
    let doc = ctx.stores.documents.get_document("s-doc").unwrap();
    assert_eq!(doc.section_id(), Some("intro"));

    store.server_set(&ctx.paths.section_document("u1", "wrap"), json!({"documentKey": "s-doc2"}));
    advance(10).await;
    assert!(ctx.stores.documents.contains("s-doc2"));

    store.server_set(&ctx.paths.section_document("u1", "wrap"), Value::Null);
    assert!(!ctx.stores.documents.contains("s-doc2"));
}
