// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::test_helpers::{advance, context, student};
use cs_core::DocumentType;
use cs_remote::MemoryStore;
use serde_json::json;

fn document(key: &str, uid: &str) -> Arc<Document> {
    Arc::new(Document::new(key, DocumentType::Problem, uid).with_content(json!({})))
}

fn content_writes(store: &MemoryStore, ctx: &SyncContext, doc: &Document) -> Vec<Value> {
    store
        .writes_under(&ctx.paths.user_document(doc.uid(), doc.key()))
        .into_iter()
        .filter(|w| w.path.ends_with("/content"))
        .map(|w| w.value)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn none_mode_registers_nothing() {
    let (ctx, store) = context(student("u1"));
    let registry = DocumentMonitorRegistry::new(ctx);
    let doc = document("d1", "u1");

    registry.monitor_document(&doc, MonitorMode::None);

    assert!(registry.is_empty());
    assert_eq!(doc.monitor_mode(), MonitorMode::None);
    assert_eq!(store.listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn remote_mode_mirrors_remote_content() {
    let (ctx, store) = context(student("u1"));
    let registry = DocumentMonitorRegistry::new(ctx.clone());
    let doc = document("d1", "u2");
    let path = ctx.paths.user_document("u2", "d1");

    registry.monitor_document(&doc, MonitorMode::Remote);
    store.server_set(&path, json!({"type": "problem", "content": r#"{"tiles":[1]}"#, "changeCount": 7}));

    assert_eq!(doc.monitor_mode(), MonitorMode::Remote);
    assert_eq!(doc.content(), json!({"tiles": [1]}));
    assert_eq!(doc.change_count(), 7);
}

#[tokio::test(start_paused = true)]
async fn remote_mode_twice_keeps_one_listener() {
    let (ctx, store) = context(student("u1"));
    let registry = DocumentMonitorRegistry::new(ctx.clone());
    let doc = document("d1", "u2");

    registry.monitor_document(&doc, MonitorMode::Remote);
    registry.monitor_document(&doc, MonitorMode::Remote);

    assert_eq!(store.listener_count_at(&ctx.paths.user_document("u2", "d1")), 1);
    assert_eq!(registry.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn unreadable_remote_content_flags_document() {
    let (ctx, store) = context(student("u1"));
    let registry = DocumentMonitorRegistry::new(ctx.clone());
    let doc = document("d1", "u2");

    registry.monitor_document(&doc, MonitorMode::Remote);
    store.server_set(&ctx.paths.user_document("u2", "d1"), json!({"type": "problem", "content": "{oops"}));

    assert_eq!(doc.content_status(), ContentStatus::Error);
    assert_eq!(doc.content(), json!({}));
}

#[tokio::test(start_paused = true)]
async fn local_mode_writes_content_with_change_count() {
    let (ctx, store) = context(student("u1"));
    let registry = DocumentMonitorRegistry::new(ctx.clone());
    let doc = document("d1", "u1");

    registry.monitor_document(&doc, MonitorMode::Local);
    doc.set_content(json!({"tiles": ["a"]}));
    advance(1500).await;
    doc.set_content(json!({"tiles": ["a", "b"]}));
    advance(1500).await;

    let path = ctx.paths.user_document("u1", "d1");
    assert_eq!(store.value_at(&format!("{path}/content")), Some(json!(r#"{"tiles":["a","b"]}"#)));
    assert_eq!(store.value_at(&format!("{path}/changeCount")), Some(json!(2)));
    assert_eq!(doc.change_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn local_mode_twice_writes_once_per_edit() {
    let (ctx, store) = context(student("u1"));
    let registry = DocumentMonitorRegistry::new(ctx.clone());
    let doc = document("d1", "u1");

    registry.monitor_document(&doc, MonitorMode::Local);
    registry.monitor_document(&doc, MonitorMode::Local);
    doc.set_content(json!({"n": 1}));
    advance(1500).await;

    assert_eq!(content_writes(&store, &ctx, &doc).len(), 1);
    assert_eq!(doc.content_observable().observer_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn remote_updates_never_echo_as_writes() {
    let (ctx, store) = context(student("u1"));
    let registry = DocumentMonitorRegistry::new(ctx.clone());
    let doc = document("d1", "u1");

    registry.monitor_document(&doc, MonitorMode::Local);
    registry.monitor_document(&doc, MonitorMode::Remote);
    store.server_set(&ctx.paths.user_document("u1", "d1"), json!({"type": "problem", "content": r#"{"n":2}"#}));
    advance(3000).await;

    assert_eq!(doc.content(), json!({"n": 2}));
    assert!(content_writes(&store, &ctx, &doc).is_empty());
    assert_eq!(doc.content_observable().observer_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn unmonitor_is_idempotent() {
    let (ctx, store) = context(student("u1"));
    let registry = DocumentMonitorRegistry::new(ctx);
    let doc = document("d1", "u2");
    let never = document("d2", "u2");

    registry.monitor_document(&doc, MonitorMode::Remote);
    registry.unmonitor_document(&doc);
    registry.unmonitor_document(&doc);
    registry.unmonitor_document(&never);

    assert!(!registry.is_monitored("d1"));
    assert_eq!(doc.monitor_mode(), MonitorMode::None);
    assert_eq!(store.listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn unmonitored_document_stops_writing() {
    let (ctx, store) = context(student("u1"));
    let registry = DocumentMonitorRegistry::new(ctx.clone());
    let doc = document("d1", "u1");

    registry.monitor_document(&doc, MonitorMode::Local);
    doc.set_content(json!({"n": 1}));
    advance(200).await;
    registry.unmonitor_document(&doc);
    advance(3000).await;

    assert!(content_writes(&store, &ctx, &doc).is_empty());
}

#[tokio::test(start_paused = true)]
async fn teardown_releases_everything() {
    let (ctx, store) = context(student("u1"));
    let registry = DocumentMonitorRegistry::new(ctx);
    let mine = document("d1", "u1");
    let theirs = document("d2", "u2");

    registry.monitor_document(&mine, MonitorMode::Local);
    registry.monitor_document(&theirs, MonitorMode::Remote);
    assert_eq!(registry.mode_of("d1"), Some(MonitorMode::Local));
    registry.teardown();

    assert!(registry.is_empty());
    assert_eq!(store.listener_count(), 0);
    assert_eq!(mine.content_observable().observer_count(), 0);
}
