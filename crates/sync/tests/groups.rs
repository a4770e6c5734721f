// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Group consistency across clients sharing one store.

#![allow(clippy::unwrap_used)]

mod common;
use common::*;

#[tokio::test(start_paused = true)]
async fn oversubscribed_group_drops_newest_member() {
    let store = shared_store();
    let observer = client(&store, teacher("t1"));
    observer.start().await.unwrap();

    seed_group(
        &store,
        &observer,
        "G1",
        &[("u1", 100, false), ("u2", 200, false), ("u3", 300, false), ("u4", 400, false), ("u5", 500, false)],
    );
    assert_eq!(observer.stores().groups.group("G1").unwrap().users.len(), 4);
    advance(1000).await;

    similar_asserts::assert_eq!(remote_members(&store, &observer, "G1"), vec!["u1", "u2", "u3", "u4"]);
    observer.stop().await;
}

#[tokio::test(start_paused = true)]
async fn removed_member_is_dropped_before_active_ones() {
    let store = shared_store();
    let observer = client(&store, teacher("t1"));
    observer.start().await.unwrap();

    seed_group(
        &store,
        &observer,
        "G1",
        &[("u1", 100, false), ("u2", 200, true), ("u3", 300, false), ("u4", 400, false), ("u5", 500, false)],
    );
    advance(1000).await;

    similar_asserts::assert_eq!(remote_members(&store, &observer, "G1"), vec!["u1", "u3", "u4", "u5"]);
    observer.stop().await;
}

#[tokio::test(start_paused = true)]
async fn group_within_limit_is_left_alone() {
    let store = shared_store();
    let observer = client(&store, teacher("t1"));
    observer.start().await.unwrap();
    store.clear_writes();

    seed_group(&store, &observer, "G1", &[("u1", 100, false), ("u2", 200, false)]);
    advance(1000).await;

    assert!(store.writes().is_empty());
    assert_eq!(remote_members(&store, &observer, "G1").len(), 2);
}

#[tokio::test(start_paused = true)]
async fn joining_a_second_group_leaves_the_first() {
    let store = shared_store();
    let s1 = client(&store, student("s1"));
    s1.start().await.unwrap();

    s1.join_group("g1").await.unwrap();
    s1.join_group("g2").await.unwrap();
    advance(1000).await;

    assert!(remote_members(&store, &s1, "g1").is_empty());
    assert_eq!(remote_members(&store, &s1, "g2"), vec!["s1"]);
    assert_eq!(s1.stores().groups.group_for_user("s1").unwrap().id, "g2");
    s1.stop().await;
}

#[tokio::test(start_paused = true)]
async fn fifth_student_joining_is_removed() {
    let store = shared_store();
    let students: Vec<SyncSession> =
        ["s1", "s2", "s3", "s4", "s5"].iter().map(|id| client(&store, student(id))).collect();
    for session in &students {
        session.start().await.unwrap();
        session.join_group("g1").await.unwrap();
        advance(10).await;
    }
    advance(1000).await;

    let members = remote_members(&store, &students[0], "g1");
    assert_eq!(members.len(), 4);
    for session in &students {
        let groups = session.stores().groups.groups();
        assert!(groups.iter().all(|g| g.active_users().count() <= 4));
    }
}

#[tokio::test(start_paused = true)]
async fn student_rejoins_latest_group_on_start() {
    let store = shared_store();
    let first = client(&store, student("s1"));
    first.start().await.unwrap();
    first.join_group("g1").await.unwrap();
    first.stop().await;
    let ctx = first.context();
    ctx.store.set(&ctx.paths.group_user("g1", "s1"), Value::Null).await.unwrap();

    let second = client(&store, student("s1"));
    second.start().await.unwrap();
    advance(100).await;

    assert_eq!(remote_members(&store, &second, "g1"), vec!["s1"]);
    assert_eq!(second.stores().latest_group_id.get().as_deref(), Some("g1"));
}
