// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

/// Resolve state directory: MC_STATE_DIR > XDG_STATE_HOME/mc-fleet > ~/.local/state/mc-fleet
pub fn state_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("MC_STATE_DIR") {
        return Some(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg).join("mc-fleet"));
    }
    let home = std::env::var("HOME").ok()?;
    Some(PathBuf::from(home).join(".local/state/mc-fleet"))
}

/// Path to the TOML config file, `MC_CONFIG_PATH` if set, else
/// `<state_dir>/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("MC_CONFIG_PATH") {
        return Some(PathBuf::from(path));
    }
    state_dir().map(|d| d.join("config.toml"))
}

/// Override for the compose project root (`MC_COMPOSE_ROOT`).
pub fn compose_root() -> Option<PathBuf> {
    std::env::var("MC_COMPOSE_ROOT").ok().map(PathBuf::from)
}

/// Override for the DNS reconciler poll interval (`MC_DNS_POLL_MS`).
pub fn dns_poll_ms() -> Option<Duration> {
    std::env::var("MC_DNS_POLL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Restic repository password, kept out of the TOML config file on
/// principle (`MC_SNAPSHOT_PASSWORD`).
pub fn snapshot_password() -> Option<String> {
    std::env::var("MC_SNAPSHOT_PASSWORD").ok()
}

/// Bearer token for the DNS/router HTTP adapters, kept out of the TOML
/// config file for the same reason as the snapshot password
/// (`MC_DNS_API_TOKEN`).
pub fn dns_api_token() -> Option<String> {
    std::env::var("MC_DNS_API_TOKEN").ok()
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
