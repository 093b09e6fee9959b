// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task-manager wrappers around `SnapshotClient` operations, the snapshot
//! counterpart to `mc-archive`'s `create_archive_task`.

use crate::client::{RepoConfig, SnapshotClient};
use mc_tasks::{ProgressHandle, TaskGenerator};
use serde_json::json;
use std::path::PathBuf;

/// Build the task body for `snapshot_backup`: opens (or creates) the
/// repository, then backs up `path`, reporting the resulting snapshot id as
/// the task's result payload. restic's `--json` backup output carries no
/// reliable overall-percentage field, so this task jumps straight from 0%
/// to 100% rather than parsing per-file progress lines.
pub fn create_backup_task(config: RepoConfig, path: PathBuf) -> TaskGenerator {
    Box::new(move |handle: ProgressHandle| {
        Box::pin(async move {
            handle.report(0, "Starting…");
            let client = SnapshotClient::new(config);
            client
                .init(handle.cancellation_token())
                .await
                .map_err(|e| e.to_string())?;
            let snapshot = client
                .backup(&path, handle.cancellation_token())
                .await
                .map_err(|e| e.to_string())?;
            handle.report_with_result(
                100,
                "Backup complete",
                json!({ "snapshot_id": snapshot.id, "short_id": snapshot.short_id }),
            );
            Ok(())
        })
    })
}

/// Build the task body for `snapshot_restore`: restores `id` into `target`,
/// optionally scoped to `include_path`.
pub fn create_restore_task(
    config: RepoConfig,
    id: String,
    target: PathBuf,
    include_path: Option<String>,
) -> TaskGenerator {
    Box::new(move |handle: ProgressHandle| {
        Box::pin(async move {
            handle.report(0, "Starting…");
            let client = SnapshotClient::new(config);
            client
                .restore(&id, &target, include_path.as_deref(), handle.cancellation_token())
                .await
                .map_err(|e| e.to_string())?;
            handle.report_with_result(100, "Restore complete", json!({ "snapshot_id": id }));
            Ok(())
        })
    })
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
