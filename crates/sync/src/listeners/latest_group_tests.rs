// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::test_helpers::{context, student};
use serde_json::json;

#[tokio::test]
async fn start_loads_and_follows_latest_group() {
    let (ctx, store) = context(student("u1"));
    let path = ctx.paths.latest_group_id("u1");
    store.server_set(&path, json!("g1"));
    let listener = LatestGroupIdListener::new(ctx.clone());

    listener.start().await.unwrap();
    assert_eq!(ctx.stores.latest_group_id.get().as_deref(), Some("g1"));

    store.server_set(&path, json!("g2"));
    assert_eq!(ctx.stores.latest_group_id.get().as_deref(), Some("g2"));

    store.server_set(&path, Value::Null);
    assert_eq!(ctx.stores.latest_group_id.get(), None);
}

#[tokio::test]
async fn stop_detaches() {
    let (ctx, store) = context(student("u1"));
    let listener = LatestGroupIdListener::new(ctx.clone());
    listener.start().await.unwrap();

    listener.stop();
    listener.stop();
    store.server_set(&ctx.paths.latest_group_id("u1"), json!("g3"));

    assert_eq!(store.listener_count(), 0);
    assert_eq!(ctx.stores.latest_group_id.get(), None);
}

#[tokio::test]
async fn failed_fetch_fails_start() {
    let (ctx, store) = context(student("u1"));
    store.fail_next_reads(1);

    let err = LatestGroupIdListener::new(ctx).start().await.unwrap_err();

    assert!(matches!(err, Error::ListenerStart { ref listener, .. } if listener == "latest_group_id"));
    assert_eq!(store.listener_count(), 0);
}
