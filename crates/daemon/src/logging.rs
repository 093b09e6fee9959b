// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing setup: a rolling daemon log file plus `RUST_LOG`-controlled
//! filtering.

use crate::config::DaemonConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes the global tracing subscriber. The returned guard must be
/// held for the process lifetime; dropping it stops the non-blocking
/// writer from flushing.
pub fn init(config: &DaemonConfig) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let dir = config.log_path.parent().unwrap_or_else(|| std::path::Path::new("."));
    let file_name = config
        .log_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "daemon.log".to_string());
    let file_appender = tracing_appender::rolling::daily(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
