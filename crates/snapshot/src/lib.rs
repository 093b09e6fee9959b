// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot engine: backs a server's data directory with a restic-compatible
//! repository, exposing init/backup/list/restore/forget/lock operations as a
//! thin typed wrapper around the binary's own `--json` output.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod client;
pub mod model;
pub mod task;

pub use client::{RepoConfig, SnapshotClient, SnapshotError};
pub use model::{RepoLock, RestoreAction, RestorePreviewEntry, Snapshot, SnapshotSummary};
pub use task::{create_backup_task, create_restore_task};
