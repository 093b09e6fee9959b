// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Archive creation: wraps the external `7z` binary via `mc-exec`,
//! streaming its `\r`-delimited progress lines out as task progress
//! updates instead of buffering them until the process exits.

use crate::filename::generate_archive_filename;
use mc_core::{Categorize, ErrorCategory};
use mc_exec::{run_streaming, ExecError, ExecOptions};
use mc_tasks::{ProgressHandle, TaskGenerator};
use serde_json::json;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("source path does not exist: {0}")]
    SourceMissing(PathBuf),
    #[error("source path escapes the server's data directory: {0}")]
    PathEscape(PathBuf),
    #[error("archive path does not exist: {0}")]
    ArchiveMissing(PathBuf),
    #[error("destination path escapes the server's data directory: {0}")]
    DestinationEscape(PathBuf),
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error("failed to stat archive output: {0}")]
    Io(#[from] std::io::Error),
}

impl Categorize for ArchiveError {
    fn category(&self) -> ErrorCategory {
        match self {
            ArchiveError::SourceMissing(_)
            | ArchiveError::PathEscape(_)
            | ArchiveError::ArchiveMissing(_)
            | ArchiveError::DestinationEscape(_) => ErrorCategory::InvalidInput,
            ArchiveError::Exec(e) => e.category(),
            ArchiveError::Io(_) => ErrorCategory::Transient,
        }
    }
}

/// Resolve `relative_path` (if any) against `data_dir`, guaranteeing the
/// result stays inside `data_dir` (no `..` escape) and exists.
fn resolve_source(data_dir: &Path, relative_path: Option<&str>) -> Result<PathBuf, ArchiveError> {
    let source = match relative_path {
        None => data_dir.to_path_buf(),
        Some(p) => data_dir.join(p.trim_start_matches('/')),
    };
    if !source.exists() {
        return Err(ArchiveError::SourceMissing(source));
    }
    let canonical_source = source
        .canonicalize()
        .map_err(|_| ArchiveError::SourceMissing(source.clone()))?;
    let canonical_root = data_dir
        .canonicalize()
        .map_err(|_| ArchiveError::SourceMissing(data_dir.to_path_buf()))?;
    if !canonical_source.starts_with(&canonical_root) {
        return Err(ArchiveError::PathEscape(source));
    }
    Ok(source)
}

/// Resolve `relative_dest` (if any) against `data_dir`, guaranteeing the
/// result stays inside `data_dir`. Unlike `resolve_source`, the destination
/// need not already exist — `7z` creates it.
fn resolve_destination(data_dir: &Path, relative_dest: Option<&str>) -> Result<PathBuf, ArchiveError> {
    let dest = match relative_dest {
        None => data_dir.to_path_buf(),
        Some(p) => data_dir.join(p.trim_start_matches('/')),
    };
    let escapes = dest
        .strip_prefix(data_dir)
        .map(|rest| rest.components().any(|c| matches!(c, std::path::Component::ParentDir)))
        .unwrap_or(true);
    if escapes {
        return Err(ArchiveError::DestinationEscape(dest));
    }
    Ok(dest)
}

/// Parse a 7z progress line like `" 42% 3 + world/level.dat"` into a
/// percentage, ignoring lines that don't carry one.
fn parse_percent(line: &str) -> Option<u8> {
    let percent_idx = line.find('%')?;
    let digits: String = line[..percent_idx]
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let digits: String = digits.chars().rev().collect();
    digits.parse::<u8>().ok().map(|v| v.min(100))
}

/// Build the task body for `archive_create`: validates the source path,
/// shells out to `7z`, and reports progress as it streams, returning the
/// final `{filename, size}` as the task's result payload.
pub fn create_archive_task(
    server_name: String,
    data_dir: PathBuf,
    archive_dir: PathBuf,
    relative_path: Option<String>,
    archiver_binary: String,
) -> TaskGenerator {
    Box::new(move |handle: ProgressHandle| {
        Box::pin(async move {
            handle.report(0, "Starting…");

            let source =
                resolve_source(&data_dir, relative_path.as_deref()).map_err(|e| e.to_string())?;

            let filename =
                generate_archive_filename(&server_name, relative_path.as_deref(), chrono::Utc::now());
            let archive_path = archive_dir.join(&filename);

            let mut cmd = Command::new(&archiver_binary);
            cmd.arg("a").arg("-mx=1").arg(&archive_path).arg(&source);

            let opts = ExecOptions {
                delimiter: b'\r',
                ..Default::default()
            };

            let handle_for_lines = handle.clone();
            let result = run_streaming(
                cmd,
                "7z archive",
                opts,
                handle.cancellation_token(),
                move |line| {
                    if let Some(percent) = parse_percent(line) {
                        handle_for_lines.report(percent, line.trim());
                    }
                },
            )
            .await;

            if let Err(err) = result {
                if archive_path.exists() {
                    if let Err(cleanup_err) = tokio::fs::remove_file(&archive_path).await {
                        warn!(error = %cleanup_err, path = %archive_path.display(), "failed to clean up partial archive");
                    }
                }
                return Err(ArchiveError::from(err).to_string());
            }

            let size = tokio::fs::metadata(&archive_path)
                .await
                .map_err(|e| ArchiveError::from(e).to_string())?
                .len();

            handle.report_with_result(
                100,
                "Archive created",
                json!({ "filename": filename, "size": size }),
            );
            Ok(())
        })
    })
}

/// Build the task body for `archive_extract`: validates the archive exists
/// and the destination stays inside the server's data directory, shells out
/// to `7z x`, and reports progress as it streams.
pub fn create_extract_task(
    data_dir: PathBuf,
    archive_path: PathBuf,
    relative_dest: Option<String>,
    archiver_binary: String,
) -> TaskGenerator {
    Box::new(move |handle: ProgressHandle| {
        Box::pin(async move {
            handle.report(0, "Starting…");

            if !archive_path.exists() {
                return Err(ArchiveError::ArchiveMissing(archive_path).to_string());
            }
            let dest =
                resolve_destination(&data_dir, relative_dest.as_deref()).map_err(|e| e.to_string())?;

            let mut cmd = Command::new(&archiver_binary);
            cmd.arg("x")
                .arg("-y")
                .arg(&archive_path)
                .arg(format!("-o{}", dest.display()));

            let opts = ExecOptions {
                delimiter: b'\r',
                ..Default::default()
            };

            let handle_for_lines = handle.clone();
            let result = run_streaming(
                cmd,
                "7z extract",
                opts,
                handle.cancellation_token(),
                move |line| {
                    if let Some(percent) = parse_percent(line) {
                        handle_for_lines.report(percent, line.trim());
                    }
                },
            )
            .await;

            if let Err(err) = result {
                return Err(ArchiveError::from(err).to_string());
            }

            handle.report_with_result(
                100,
                "Archive extracted",
                json!({ "destination": dest.display().to_string() }),
            );
            Ok(())
        })
    })
}

#[cfg(test)]
#[path = "compress_tests.rs"]
mod tests;
