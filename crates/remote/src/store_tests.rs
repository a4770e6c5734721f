// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[parameterized(
    simple = { "a/b", "c", "a/b/c" },
    slashes = { "/a/b/", "/c/", "a/b/c" },
    empty_parent = { "", "c", "c" },
    empty_child = { "a", "", "a" },
)]
fn child_path_joins(parent: &str, child: &str, expected: &str) {
    assert_eq!(child_path(parent, child), expected);
}

#[test]
fn server_timestamp_detection() {
    assert!(is_server_timestamp(&server_timestamp()));
    assert!(!is_server_timestamp(&json!({".sv": "increment"})));
    assert!(!is_server_timestamp(&json!(12)));
}
