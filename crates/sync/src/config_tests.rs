// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use tempfile::TempDir;
use yare::parameterized;

#[test]
fn empty_file_uses_defaults() {
    let config = SyncConfig::parse("").unwrap();
    assert_eq!(config, SyncConfig::default());
    assert_eq!(config.throttle(), Duration::from_secs(1));
    assert!(config.retry.enabled);
    assert_eq!(config.retry.base_delay_ms, 5000);
    assert_eq!(config.retry.max_delay_ms, 30_000);
    assert_eq!(config.groups.max_group_size, 4);
}

#[test]
fn partial_sections_fill_defaults() {
    let config = SyncConfig::parse(
        r#"
throttle_ms = 250

[retry]
max_attempts = 3
"#,
    )
    .unwrap();

    assert_eq!(config.throttle_ms, 250);
    assert_eq!(config.retry.max_attempts, Some(3));
    assert_eq!(config.retry.base_delay_ms, 5000);
    assert_eq!(config.groups.correction_delay_ms, 250);
}

#[parameterized(
    zero_group = { "[groups]\nmax_group_size = 0" },
    zero_attempts = { "[retry]\nmax_attempts = 0" },
    inverted_delays = { "[retry]\nbase_delay_ms = 10\nmax_delay_ms = 5" },
    bad_type = { "throttle_ms = \"fast\"" },
)]
fn invalid_configs_rejected(content: &str) {
    let err = SyncConfig::parse(content).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn save_then_load() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join(CONFIG_FILE_NAME);
    let config = SyncConfig { debug_save: true, throttle_ms: 50, ..SyncConfig::default() };

    config.save(&path).unwrap();
    let loaded = SyncConfig::load(&path).unwrap();

    assert_eq!(loaded, config);
}

#[test]
fn load_missing_file_fails() {
    let temp = TempDir::new().unwrap();
    let err = SyncConfig::load(&temp.path().join("absent.toml")).unwrap_err();
    assert!(err.to_string().contains("failed to read"));
}

#[test]
fn explicit_index_path_wins() {
    let config = SyncConfig { index_path: Some(PathBuf::from("/tmp/idx.db")), ..SyncConfig::default() };
    assert_eq!(config.resolved_index_path(), Some(PathBuf::from("/tmp/idx.db")));
}
