// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Derived lifecycle status. Never persisted: every read recomputes it from
//! the compose project's raw state plus a liveness probe.

use serde::{Deserialize, Serialize};

/// Raw state reported by the compose driver for a server's primary
/// container, before any liveness probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawContainerState {
    /// No compose project directory exists for this server.
    Removed,
    /// A compose project exists but `docker compose create` has not run
    /// (or the container was removed without removing the project files).
    Exists,
    /// The container exists but is not running.
    Created,
    /// `docker compose ps` reports the container as running.
    Running,
}

/// The full lifecycle status exposed to operators, combining raw container
/// state with a liveness probe result for `Running` containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    /// No compose project for this server.
    Removed,
    /// Compose project exists, no container created yet.
    Exists,
    /// Container created but not started.
    Created,
    /// Container is running but neither RCON nor the game port answers yet.
    Starting,
    /// Container is running and the game port responds to a status probe.
    Healthy,
    /// Container is running but no liveness probe has confirmed health
    /// (probe not attempted, e.g. transient network error).
    Running,
}

impl LifecycleStatus {
    /// Derive the operator-facing status from the raw container state and,
    /// for running containers, whether a liveness probe succeeded.
    pub fn derive(raw: RawContainerState, probe: Option<bool>) -> Self {
        match raw {
            RawContainerState::Removed => LifecycleStatus::Removed,
            RawContainerState::Exists => LifecycleStatus::Exists,
            RawContainerState::Created => LifecycleStatus::Created,
            RawContainerState::Running => match probe {
                Some(true) => LifecycleStatus::Healthy,
                Some(false) => LifecycleStatus::Starting,
                None => LifecycleStatus::Running,
            },
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
