// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync configuration.
//!
//! Loaded from `config.toml` under the user config directory (see
//! [`default_config_path`]). Every field has a default, so an empty or
//! partial file is valid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

const APP_DIR_NAME: &str = "cosync";
const CONFIG_FILE_NAME: &str = "config.toml";
const INDEX_FILE_NAME: &str = "index.db";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Top-level namespace of the remote tree (e.g. "authed", "demo").
    #[serde(default = "default_app_mode")]
    pub app_mode: String,
    /// Minimum interval between writes of one field, in milliseconds.
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
    /// Log every outgoing document write at info level.
    #[serde(default)]
    pub debug_save: bool,
    /// Location of the metadata index database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_path: Option<PathBuf>,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub groups: GroupsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Delay before the first retry; later retries grow linearly.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Total attempts including the first. Unlimited when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupsConfig {
    #[serde(default = "default_max_group_size")]
    pub max_group_size: usize,
    /// How long corrective membership writes wait for a newer snapshot.
    #[serde(default = "default_correction_delay_ms")]
    pub correction_delay_ms: u64,
}

fn default_app_mode() -> String {
    "authed".to_string()
}

fn default_throttle_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

fn default_base_delay_ms() -> u64 {
    5000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_max_group_size() -> usize {
    4
}

fn default_correction_delay_ms() -> u64 {
    250
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            app_mode: default_app_mode(),
            throttle_ms: default_throttle_ms(),
            debug_save: false,
            index_path: None,
            retry: RetryConfig::default(),
            groups: GroupsConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            enabled: true,
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: None,
        }
    }
}

impl Default for GroupsConfig {
    fn default() -> Self {
        GroupsConfig {
            max_group_size: default_max_group_size(),
            correction_delay_ms: default_correction_delay_ms(),
        }
    }
}

impl SyncConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    /// Loads the config at the default location, or defaults if absent.
    pub fn load_or_default() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(SyncConfig::default()),
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: SyncConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.groups.max_group_size == 0 {
            return Err(Error::Config("groups.max_group_size must be at least 1".into()));
        }
        if self.retry.max_attempts == Some(0) {
            return Err(Error::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(Error::Config("retry.max_delay_ms must not be below retry.base_delay_ms".into()));
        }
        Ok(())
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub fn correction_delay(&self) -> Duration {
        Duration::from_millis(self.groups.correction_delay_ms)
    }

    /// Configured index path, or the per-user default.
    pub fn resolved_index_path(&self) -> Option<PathBuf> {
        self.index_path.clone().or_else(default_index_path)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

pub fn default_index_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join(APP_DIR_NAME).join(INDEX_FILE_NAME))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
