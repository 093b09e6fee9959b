// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Subprocess execution layer shared by the container driver, the archive
//! engine, and the snapshot engine: spawn a child, stream its merged
//! stdout+stderr as complete lines while it runs, and support cancellation
//! with a bounded kill grace period.

use mc_core::{Categorize, ErrorCategory};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Errors surfaced by [`run_streaming`].
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to spawn {description}: {source}")]
    Spawn {
        description: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{description} timed out after {timeout_secs}s")]
    Timeout {
        description: String,
        timeout_secs: u64,
    },
    #[error("{description} exited with status {exit_code:?}")]
    Failed {
        description: String,
        exit_code: Option<i32>,
        combined_output: String,
    },
    #[error("{description} was cancelled")]
    Cancelled { description: String },
}

impl Categorize for ExecError {
    fn category(&self) -> ErrorCategory {
        match self {
            ExecError::Spawn { .. } => ErrorCategory::Unavailable,
            ExecError::Timeout { .. } => ErrorCategory::Transient,
            ExecError::Failed { .. } => ErrorCategory::Fatal,
            ExecError::Cancelled { .. } => ErrorCategory::Conflict,
        }
    }
}

/// Tuning knobs for a single [`run_streaming`] invocation.
#[derive(Debug, Clone)]
pub struct ExecOptions {
    /// Overall wall-clock budget for the command. `None` means no timeout.
    pub timeout: Option<Duration>,
    /// How long to wait for a graceful exit after sending a kill signal
    /// (cancellation or timeout) before giving up on draining output.
    pub kill_grace: Duration,
    /// Byte that separates output "lines". Most commands use `\n`;
    /// progress-bar style tools (7z, restic) often use `\r`.
    pub delimiter: u8,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            kill_grace: Duration::from_secs(5),
            delimiter: b'\n',
        }
    }
}

/// Successful result of a command that ran to completion with exit code 0.
#[derive(Debug, Clone)]
pub struct ExecOutcome {
    pub exit_code: Option<i32>,
    pub combined_output: String,
}

/// Spawn `cmd`, calling `on_line` for every complete line of merged
/// stdout+stderr as it becomes available, and return once the child exits.
///
/// `cancel` lets a caller abort the command mid-flight: on cancellation the
/// child is sent a kill signal and given `opts.kill_grace` to exit before
/// this function returns `Err(ExecError::Cancelled)` regardless.
pub async fn run_streaming<F>(
    mut cmd: Command,
    description: &str,
    opts: ExecOptions,
    cancel: CancellationToken,
    mut on_line: F,
) -> Result<ExecOutcome, ExecError>
where
    F: FnMut(&str) + Send,
{
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.stdin(Stdio::null());

    let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
        description: description.to_string(),
        source,
    })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ExecError::Spawn {
            description: description.to_string(),
            source: std::io::Error::other("stdout was not piped"),
        })?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| ExecError::Spawn {
            description: description.to_string(),
            source: std::io::Error::other("stderr was not piped"),
        })?;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let delimiter = opts.delimiter;
    let stdout_task = tokio::spawn(stream_lines(stdout, delimiter, tx.clone()));
    let stderr_task = tokio::spawn(stream_lines(stderr, delimiter, tx));

    let sleep_for = opts
        .timeout
        .unwrap_or_else(|| Duration::from_secs(60 * 60 * 24 * 365));
    let sleep = tokio::time::sleep(sleep_for);
    tokio::pin!(sleep);

    let mut combined = String::new();
    let mut lines_done = false;
    let wait_fut = child.wait();
    tokio::pin!(wait_fut);

    let status: ExitStatus = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(finish_cancelled(&mut child, opts.kill_grace, stdout_task, stderr_task, description).await);
            }
            _ = &mut sleep, if opts.timeout.is_some() => {
                let _ = child.start_kill();
                let _ = tokio::time::timeout(opts.kill_grace, child.wait()).await;
                stdout_task.abort();
                stderr_task.abort();
                return Err(ExecError::Timeout {
                    description: description.to_string(),
                    timeout_secs: opts.timeout.unwrap_or_default().as_secs(),
                });
            }
            maybe_line = rx.recv(), if !lines_done => {
                match maybe_line {
                    Some(line) => {
                        on_line(&line);
                        combined.push_str(&line);
                        combined.push('\n');
                    }
                    None => lines_done = true,
                }
            }
            result = &mut wait_fut => {
                break result.map_err(|source| ExecError::Spawn {
                    description: description.to_string(),
                    source,
                })?;
            }
        }
    };

    // Drain any lines the readers buffered between the process exiting and
    // the last time we polled the channel.
    while let Ok(line) = rx.try_recv() {
        on_line(&line);
        combined.push_str(&line);
        combined.push('\n');
    }
    let _ = stdout_task.await;
    let _ = stderr_task.await;

    if status.success() {
        Ok(ExecOutcome {
            exit_code: status.code(),
            combined_output: combined,
        })
    } else {
        Err(ExecError::Failed {
            description: description.to_string(),
            exit_code: status.code(),
            combined_output: combined,
        })
    }
}

async fn finish_cancelled(
    child: &mut tokio::process::Child,
    kill_grace: Duration,
    stdout_task: tokio::task::JoinHandle<()>,
    stderr_task: tokio::task::JoinHandle<()>,
    description: &str,
) -> ExecError {
    let _ = child.start_kill();
    let _ = tokio::time::timeout(kill_grace, child.wait()).await;
    stdout_task.abort();
    stderr_task.abort();
    ExecError::Cancelled {
        description: description.to_string(),
    }
}

async fn stream_lines<R>(reader: R, delimiter: u8, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    loop {
        let mut buf = Vec::new();
        match reader.read_until(delimiter, &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if buf.last() == Some(&delimiter) {
                    buf.pop();
                }
                if buf.last() == Some(&b'\r') {
                    buf.pop();
                }
                let line = String::from_utf8_lossy(&buf).into_owned();
                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
