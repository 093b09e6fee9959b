// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: a TOML file on disk, with a handful of
//! environment overrides for values that shouldn't live in a checked-in
//! config (secrets) or that operators commonly want to flip per-invocation.

use mc_core::{Categorize, ErrorCategory};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine a state directory (set MC_STATE_DIR or HOME)")]
    NoStateDir,
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl Categorize for ConfigError {
    fn category(&self) -> ErrorCategory {
        match self {
            ConfigError::NoStateDir => ErrorCategory::Fatal,
            ConfigError::Read { .. } | ConfigError::Parse { .. } => ErrorCategory::InvalidInput,
        }
    }
}

/// On-disk shape of `config.toml`. Every field has a sane default so an
/// operator can start with an empty or partial file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub compose_root: Option<String>,
    pub archive_dir: Option<String>,
    pub archiver_binary: Option<String>,
    pub snapshot_repository: Option<String>,
    pub snapshot_binary: Option<String>,
    pub dns_domain: Option<String>,
    pub dns_managed_sub: Option<String>,
    pub dns_poll_interval_secs: Option<u64>,
    pub dns_backoff_floor_secs: Option<u64>,
    pub dns_backoff_cap_secs: Option<u64>,
    pub router_base_url: Option<String>,
    pub restart_window_start: Option<String>,
}

/// Resolved daemon configuration: every field is present, defaults applied.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub state_dir: PathBuf,
    pub log_path: PathBuf,
    pub compose_root: PathBuf,
    pub archive_dir: PathBuf,
    pub archiver_binary: String,
    pub snapshot_repository: String,
    pub snapshot_binary: String,
    pub snapshot_password: Option<String>,
    pub dns_domain: String,
    pub dns_managed_sub: String,
    pub dns_poll_interval: Duration,
    pub dns_backoff_floor: Duration,
    pub dns_backoff_cap: Duration,
    pub router_base_url: String,
    pub restart_window_start: String,
}

impl DaemonConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let state_dir = crate::env::state_dir().ok_or(ConfigError::NoStateDir)?;
        let config_path = crate::env::config_path().ok_or(ConfigError::NoStateDir)?;

        let file = if config_path.exists() {
            let text = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
                path: config_path.clone(),
                source,
            })?;
            toml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: config_path,
                source,
            })?
        } else {
            ConfigFile::default()
        };

        Ok(Self::from_file(state_dir, file))
    }

    fn from_file(state_dir: PathBuf, file: ConfigFile) -> Self {
        let compose_root = crate::env::compose_root()
            .or_else(|| file.compose_root.map(PathBuf::from))
            .unwrap_or_else(|| state_dir.join("servers"));

        Self {
            log_path: state_dir.join("daemon.log"),
            archive_dir: file
                .archive_dir
                .map(PathBuf::from)
                .unwrap_or_else(|| state_dir.join("archives")),
            archiver_binary: file.archiver_binary.unwrap_or_else(|| "7z".to_string()),
            snapshot_repository: file
                .snapshot_repository
                .unwrap_or_else(|| state_dir.join("snapshots").display().to_string()),
            snapshot_binary: file.snapshot_binary.unwrap_or_else(|| "restic".to_string()),
            snapshot_password: crate::env::snapshot_password(),
            dns_domain: file.dns_domain.unwrap_or_default(),
            dns_managed_sub: file.dns_managed_sub.unwrap_or_default(),
            dns_poll_interval: crate::env::dns_poll_ms().unwrap_or_else(|| {
                Duration::from_secs(file.dns_poll_interval_secs.unwrap_or(30))
            }),
            dns_backoff_floor: Duration::from_secs(file.dns_backoff_floor_secs.unwrap_or(5)),
            dns_backoff_cap: Duration::from_secs(file.dns_backoff_cap_secs.unwrap_or(300)),
            router_base_url: file.router_base_url.unwrap_or_default(),
            restart_window_start: file.restart_window_start.unwrap_or_else(|| "03:00".to_string()),
            compose_root,
            state_dir,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
