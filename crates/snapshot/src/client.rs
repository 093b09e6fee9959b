// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wraps a restic-compatible binary via `mc-exec`, parsing its `--json`
//! / `--json` NDJSON output line by line as it streams rather than
//! buffering the whole run, the same "read the tool's own structured
//! output mode" idiom used for the compose driver's `ps`/exec probing.

use crate::model::{RepoLock, RestoreAction, RestorePreviewEntry, Snapshot, SnapshotSummary};
use chrono::{DateTime, Utc};
use mc_core::{Categorize, ErrorCategory};
use mc_exec::{run_streaming, ExecError, ExecOptions};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("invalid snapshot id: {0}")]
    InvalidSnapshotId(String),
    #[error("path is not absolute: {0}")]
    NonAbsolutePath(PathBuf),
    #[error("snapshot repository unavailable: {0}")]
    RepoUnavailable(String),
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error("failed to parse restic output: {0}")]
    Parse(String),
}

impl Categorize for SnapshotError {
    fn category(&self) -> ErrorCategory {
        match self {
            SnapshotError::InvalidSnapshotId(_) | SnapshotError::NonAbsolutePath(_) => {
                ErrorCategory::InvalidInput
            }
            SnapshotError::RepoUnavailable(_) => ErrorCategory::Unavailable,
            SnapshotError::Exec(e) => e.category(),
            SnapshotError::Parse(_) => ErrorCategory::Fatal,
        }
    }
}

/// Credentials and location of a restic-compatible repository.
#[derive(Debug, Clone)]
pub struct RepoConfig {
    pub binary: String,
    pub repository: String,
    pub password: String,
}

pub struct SnapshotClient {
    config: RepoConfig,
}

impl SnapshotClient {
    pub fn new(config: RepoConfig) -> Self {
        Self { config }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.config.binary);
        cmd.arg("-r").arg(&self.config.repository);
        cmd.args(args);
        cmd.env("RESTIC_PASSWORD", &self.config.password);
        cmd
    }

    async fn run_json_lines(
        &self,
        description: &str,
        cmd: Command,
        cancel: CancellationToken,
    ) -> Result<Vec<serde_json::Value>, SnapshotError> {
        let lines = Mutex::new(Vec::new());
        let outcome = run_streaming(
            cmd,
            description,
            ExecOptions::default(),
            cancel,
            |line| {
                if let Ok(value) = serde_json::from_str::<serde_json::Value>(line) {
                    lines.lock().push(value);
                }
            },
        )
        .await;
        outcome?;
        Ok(lines.into_inner())
    }

    /// Idempotent create-or-open: restic's "already initialized" failure
    /// is treated as success rather than propagated.
    pub async fn init(&self, cancel: CancellationToken) -> Result<(), SnapshotError> {
        let cmd = self.command(&["init", "--json"]);
        match run_streaming(
            cmd,
            "restic init",
            ExecOptions::default(),
            cancel,
            |_| {},
        )
        .await
        {
            Ok(_) => Ok(()),
            Err(ExecError::Failed { combined_output, .. })
                if combined_output.contains("already initialized") =>
            {
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn backup(&self, path: &Path, cancel: CancellationToken) -> Result<Snapshot, SnapshotError> {
        if !path.is_absolute() {
            return Err(SnapshotError::NonAbsolutePath(path.to_path_buf()));
        }
        let path_str = path.to_string_lossy().into_owned();
        let cmd = self.command(&["backup", &path_str, "--json"]);
        let lines = self.run_json_lines("restic backup", cmd, cancel).await?;

        let summary_line = lines
            .iter()
            .find(|v| v.get("message_type").and_then(|m| m.as_str()) == Some("summary"))
            .ok_or_else(|| SnapshotError::Parse("no summary message in restic backup output".into()))?;

        let snapshot_id = summary_line
            .get("snapshot_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SnapshotError::Parse("summary missing snapshot_id".into()))?
            .to_string();
        let summary = SnapshotSummary {
            files_new: summary_line.get("files_new").and_then(|v| v.as_u64()).unwrap_or(0),
            total_files_processed: summary_line
                .get("total_files_processed")
                .and_then(|v| v.as_u64())
                .unwrap_or(0),
            total_bytes_processed: summary_line
                .get("total_bytes_processed")
                .and_then(|v| v.as_u64())
                .unwrap_or(0),
        };

        Ok(Snapshot {
            short_id: snapshot_id.chars().take(8).collect(),
            id: snapshot_id,
            time: Utc::now(),
            paths: vec![path_str],
            hostname: whoami_hostname(),
            username: whoami_username(),
            summary: Some(summary),
        })
    }

    /// List snapshots newest-first, optionally filtered to those whose
    /// recorded paths cover `path_filter` (an exact match or an ancestor
    /// of it).
    pub async fn list(
        &self,
        path_filter: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<Vec<Snapshot>, SnapshotError> {
        let cmd = self.command(&["snapshots", "--json"]);
        let lines = self.run_json_lines("restic snapshots", cmd, cancel).await?;

        let array = lines
            .into_iter()
            .find(|v| v.is_array())
            .ok_or_else(|| SnapshotError::Parse("expected a json array from restic snapshots".into()))?;

        let mut snapshots: Vec<Snapshot> = array
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(parse_snapshot_entry)
            .collect();

        snapshots.sort_by(|a, b| b.time.cmp(&a.time));

        if let Some(filter) = path_filter {
            snapshots.retain(|s| {
                s.paths
                    .iter()
                    .any(|p| filter == p || filter.starts_with(p.as_str()))
            });
        }
        Ok(snapshots)
    }

    pub async fn restore_preview(
        &self,
        id: &str,
        target: &Path,
        include_path: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<Vec<RestorePreviewEntry>, SnapshotError> {
        validate_id(id)?;
        let target_str = target.to_string_lossy().into_owned();
        let mut args = vec!["restore", id, "--target", &target_str, "--dry-run", "--json", "-v"];
        if let Some(include) = include_path {
            args.push("--include");
            args.push(include);
        }
        let cmd = self.command(&args);
        let lines = self.run_json_lines("restic restore --dry-run", cmd, cancel).await?;
        Ok(lines.into_iter().filter_map(parse_restore_entry).collect())
    }

    pub async fn restore(
        &self,
        id: &str,
        target: &Path,
        include_path: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<(), SnapshotError> {
        validate_id(id)?;
        let target_str = target.to_string_lossy().into_owned();
        let mut args = vec!["restore", id, "--target", &target_str, "--json"];
        if let Some(include) = include_path {
            args.push("--include");
            args.push(include);
        }
        let cmd = self.command(&args);
        self.run_json_lines("restic restore", cmd, cancel).await?;
        Ok(())
    }

    pub async fn forget(
        &self,
        keep_last: u32,
        prune: bool,
        cancel: CancellationToken,
    ) -> Result<(), SnapshotError> {
        let keep_arg = keep_last.to_string();
        let mut args = vec!["forget", "--keep-last", keep_arg.as_str(), "--json"];
        if prune {
            args.push("--prune");
        }
        let cmd = self.command(&args);
        self.run_json_lines("restic forget", cmd, cancel).await?;
        Ok(())
    }

    pub async fn list_locks(&self, cancel: CancellationToken) -> Result<Vec<RepoLock>, SnapshotError> {
        let cmd = self.command(&["list", "locks", "--json"]);
        let lines = self.run_json_lines("restic list locks", cmd, cancel).await?;
        Ok(lines.into_iter().filter_map(parse_lock_entry).collect())
    }

    pub async fn unlock(&self, cancel: CancellationToken) -> Result<(), SnapshotError> {
        let cmd = self.command(&["unlock"]);
        self.run_json_lines("restic unlock", cmd, cancel).await?;
        Ok(())
    }
}

fn validate_id(id: &str) -> Result<(), SnapshotError> {
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(SnapshotError::InvalidSnapshotId(id.to_string()));
    }
    Ok(())
}

fn parse_snapshot_entry(value: &serde_json::Value) -> Option<Snapshot> {
    let id = value.get("id")?.as_str()?.to_string();
    let time = value
        .get("time")
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    let paths = value
        .get("paths")
        .and_then(|v| v.as_array())
        .map(|a| a.iter().filter_map(|p| p.as_str().map(String::from)).collect())
        .unwrap_or_default();
    Some(Snapshot {
        short_id: id.chars().take(8).collect(),
        id,
        time,
        paths,
        hostname: value.get("hostname").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
        username: value.get("username").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
        summary: None,
    })
}

fn parse_restore_entry(value: serde_json::Value) -> Option<RestorePreviewEntry> {
    let action = match value.get("action")?.as_str()? {
        "restored" => RestoreAction::Restored,
        "updated" => RestoreAction::Updated,
        "deleted" => RestoreAction::Deleted,
        _ => return None,
    };
    Some(RestorePreviewEntry {
        action,
        item: value.get("item")?.as_str()?.to_string(),
        size: value.get("size").and_then(|v| v.as_u64()).unwrap_or(0),
    })
}

fn parse_lock_entry(value: serde_json::Value) -> Option<RepoLock> {
    Some(RepoLock {
        id: value.get("id")?.as_str()?.to_string(),
        time: value
            .get("time")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now),
        hostname: value.get("hostname").and_then(|v| v.as_str()).map(String::from),
    })
}

fn whoami_hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

fn whoami_username() -> String {
    std::env::var("USER").unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
