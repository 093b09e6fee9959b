// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Data returned by the snapshot engine. Field names follow restic's
//! `--json` output, the machine-readable mode every operation here parses
//! instead of screen-scraping restic's human-readable text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub files_new: u64,
    pub total_files_processed: u64,
    pub total_bytes_processed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub short_id: String,
    pub time: DateTime<Utc>,
    pub paths: Vec<String>,
    pub hostname: String,
    pub username: String,
    pub summary: Option<SnapshotSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestoreAction {
    Restored,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestorePreviewEntry {
    pub action: RestoreAction,
    pub item: String,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoLock {
    pub id: String,
    pub time: DateTime<Utc>,
    pub hostname: Option<String>,
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
