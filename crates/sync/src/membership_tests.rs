// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::test_helpers::{clocked_context, context, student};
use cs_core::MockClock;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn join_creates_group_and_membership() {
    let clock = Arc::new(MockClock::new(1_234));
    let (ctx, store) = clocked_context(student("u1"), &clock);
    let membership = GroupMembership::new(ctx.clone());

    membership.join_group("g1").await.unwrap();

    let user = store.value_at(&ctx.paths.group_user("g1", "u1")).unwrap();
    assert_eq!(user["connectedTimestamp"], json!(1_234));
    assert_eq!(user["self"]["uid"], json!("u1"));
    assert_eq!(store.value_at(&ctx.paths.group("g1")).unwrap()["version"], json!("1.0"));
    assert_eq!(store.value_at(&ctx.paths.latest_group_id("u1")), Some(json!("g1")));
    assert_eq!(ctx.stores.latest_group_id.get().as_deref(), Some("g1"));
    assert!(membership.presence().is_armed());
}

#[tokio::test]
async fn join_keeps_existing_members() {
    let (ctx, store) = context(student("u2"));
    store.server_set(&ctx.paths.group_user("g1", "u1"), json!({"connectedTimestamp": 10}));

    GroupMembership::new(ctx.clone()).join_group("g1").await.unwrap();

    let users = store.value_at(&format!("{}/users", ctx.paths.group("g1"))).unwrap();
    let ids: Vec<&String> = users.as_object().unwrap().keys().collect();
    assert_eq!(ids, vec!["u1", "u2"]);
}

#[tokio::test]
async fn leave_removes_from_every_group() {
    let (ctx, store) = context(student("u1"));
    let membership = GroupMembership::new(ctx.clone());
    membership.join_group("g1").await.unwrap();
    store.server_set(&ctx.paths.group_user("g2", "u1"), json!({"connectedTimestamp": 10}));
    store.server_set(&ctx.paths.group_user("g2", "u9"), json!({"connectedTimestamp": 10}));

    membership.leave_group().await.unwrap();

    assert_eq!(store.value_at(&ctx.paths.group_user("g1", "u1")), None);
    assert_eq!(store.value_at(&ctx.paths.group_user("g2", "u1")), None);
    assert!(store.value_at(&ctx.paths.group_user("g2", "u9")).is_some());
    assert_eq!(store.value_at(&ctx.paths.latest_group_id("u1")), None);
    assert_eq!(ctx.stores.latest_group_id.get(), None);
    assert!(store.disconnect_writes().is_empty());
}

#[tokio::test]
async fn leave_other_groups_keeps_one() {
    let (ctx, store) = context(student("u1"));
    for group in ["g1", "g2", "g3"] {
        store.server_set(&ctx.paths.group_user(group, "u1"), json!({"connectedTimestamp": 10}));
    }

    let removed = GroupMembership::new(ctx.clone()).leave_other_groups("g2").await.unwrap();

    assert_eq!(removed, 2);
    assert!(store.value_at(&ctx.paths.group_user("g2", "u1")).is_some());
    assert_eq!(store.value_at(&ctx.paths.group("g1")), None);
    assert_eq!(store.value_at(&ctx.paths.group("g3")), None);
}

#[tokio::test]
async fn remove_users_writes_one_update() {
    let (ctx, store) = context(student("u1"));
    store.server_set(&ctx.paths.group_user("g1", "u4"), json!({"connectedTimestamp": 10}));
    store.server_set(&ctx.paths.group_user("g1", "u5"), json!({"connectedTimestamp": 20}));
    let membership = GroupMembership::new(ctx.clone());

    membership.remove_users(&[]).await.unwrap();
    assert!(store.writes().is_empty());

    membership.remove_users(&[("g1".into(), "u5".into())]).await.unwrap();

    let writes = store.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].path, ctx.paths.group_user("g1", "u5"));
    assert!(store.value_at(&ctx.paths.group_user("g1", "u4")).is_some());
}
