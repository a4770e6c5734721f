// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;

#[test]
fn system_clock_is_after_2020() {
    assert!(SystemClock.now_ms() > 1_577_836_800_000);
}

#[test]
fn mock_clock_set_and_advance() {
    let clock = MockClock::new(1000);
    assert_eq!(clock.now_ms(), 1000);
    clock.advance(250);
    assert_eq!(clock.now_ms(), 1250);
    clock.set(10);
    assert_eq!(clock.now_ms(), 10);
}
