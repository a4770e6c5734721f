// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::test_helpers::{advance, clocked_context, student};
use cs_core::MockClock;
use serde_json::json;

#[tokio::test(start_paused = true)]
async fn disconnect_stamps_group_record() {
    let clock = Arc::new(MockClock::new(1_000));
    let (ctx, store) = clocked_context(student("u1"), &clock);
    let presence = Presence::new(ctx.clone());

    presence.arm("g1").await.unwrap();
    assert_eq!(presence.group_id().as_deref(), Some("g1"));
    clock.set(5_000);
    store.set_connected(false);

    let path = ctx.paths.group_user("g1", "u1");
    assert_eq!(store.value_at(&format!("{path}/disconnectedTimestamp")), Some(json!(5_000)));
}

#[tokio::test(start_paused = true)]
async fn reconnect_refreshes_connected_timestamp() {
    let clock = Arc::new(MockClock::new(1_000));
    let (ctx, store) = clocked_context(student("u1"), &clock);
    let presence = Presence::new(ctx.clone());
    presence.arm("g1").await.unwrap();

    store.set_connected(false);
    clock.set(9_000);
    store.set_connected(true);
    advance(10).await;

    let path = ctx.paths.group_user("g1", "u1");
    assert_eq!(store.value_at(&format!("{path}/connectedTimestamp")), Some(json!(9_000)));
    assert_eq!(store.disconnect_writes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn initial_connection_event_writes_nothing() {
    let clock = Arc::new(MockClock::new(1_000));
    let (ctx, store) = clocked_context(student("u1"), &clock);
    let presence = Presence::new(ctx);

    presence.arm("g1").await.unwrap();
    advance(10).await;

    assert!(store.writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn disarm_cancels_disconnect_write() {
    let clock = Arc::new(MockClock::new(1_000));
    let (ctx, store) = clocked_context(student("u1"), &clock);
    let presence = Presence::new(ctx);

    presence.arm("g1").await.unwrap();
    presence.disarm().await.unwrap();
    presence.disarm().await.unwrap();

    assert!(!presence.is_armed());
    assert!(store.disconnect_writes().is_empty());
    assert_eq!(store.listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn rearming_moves_to_new_group() {
    let clock = Arc::new(MockClock::new(1_000));
    let (ctx, store) = clocked_context(student("u1"), &clock);
    let presence = Presence::new(ctx.clone());

    presence.arm("g1").await.unwrap();
    presence.arm("g2").await.unwrap();

    let writes = store.disconnect_writes();
    assert_eq!(writes.len(), 1);
    assert!(writes[0].0.starts_with(&ctx.paths.group_user("g2", "u1")));
    assert_eq!(store.listener_count(), 1);
}

#[tokio::test]
async fn arming_offline_fails() {
    let clock = Arc::new(MockClock::new(1_000));
    let (ctx, store) = clocked_context(student("u1"), &clock);
    store.set_connected(false);

    let err = Presence::new(ctx).arm("g1").await.unwrap_err();
    assert!(err.is_transient());
}
