// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;

#[test]
fn init_creates_log_file_and_tolerates_repeat_calls() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs").join("cosync.log");

    init(Some(&path));
    init(Some(&path));
    init(None);

    assert!(path.exists());
}
