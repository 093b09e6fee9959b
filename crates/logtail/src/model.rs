// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use mc_core::ServerId;
use thiserror::Error;

/// A single complete line read from a server's log file, optionally parsed
/// into a structured event by the server's registered [`crate::parser::LineParser`].
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub server_id: ServerId,
    pub line: String,
    pub parsed: Option<serde_json::Value>,
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("already watching server {0}")]
    AlreadyWatching(ServerId),
    #[error("not watching server {0}")]
    NotWatching(ServerId),
    #[error("dispatcher is stopped, refusing new watchers")]
    Stopped,
}

impl mc_core::Categorize for WatchError {
    fn category(&self) -> mc_core::ErrorCategory {
        match self {
            WatchError::AlreadyWatching(_) => mc_core::ErrorCategory::Conflict,
            WatchError::NotWatching(_) => mc_core::ErrorCategory::NotFound,
            WatchError::Stopped => mc_core::ErrorCategory::Conflict,
        }
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
