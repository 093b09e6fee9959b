// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One tailing task per server: a file-change notification fires an
//! immediate read, with a poll-interval fallback so a watcher still makes
//! progress if the notification backend misses an event or isn't available
//! on the target filesystem.

use crate::model::{LogEvent, WatchError};
use crate::parser::LineParser;
use crate::tail::TailReader;
use mc_core::ServerId;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

struct WatcherHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

pub struct LogTailDispatcher {
    event_tx: mpsc::UnboundedSender<LogEvent>,
    watchers: Mutex<HashMap<ServerId, WatcherHandle>>,
    stopped: Arc<AtomicBool>,
    poll_interval: Duration,
}

impl LogTailDispatcher {
    pub fn new(event_tx: mpsc::UnboundedSender<LogEvent>) -> Self {
        Self {
            event_tx,
            watchers: Mutex::new(HashMap::new()),
            stopped: Arc::new(AtomicBool::new(false)),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    #[cfg(test)]
    pub fn with_poll_interval(event_tx: mpsc::UnboundedSender<LogEvent>, poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            ..Self::new(event_tx)
        }
    }

    pub fn watch(
        &self,
        server_id: ServerId,
        path: PathBuf,
        parser: Arc<dyn LineParser>,
    ) -> Result<(), WatchError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(WatchError::Stopped);
        }
        let mut watchers = self.watchers.lock();
        if watchers.contains_key(&server_id) {
            return Err(WatchError::AlreadyWatching(server_id));
        }
        let cancel = CancellationToken::new();
        let task = tokio::spawn(tail_loop(
            server_id.clone(),
            path,
            parser,
            self.event_tx.clone(),
            cancel.clone(),
            self.poll_interval,
        ));
        watchers.insert(server_id, WatcherHandle { cancel, task });
        Ok(())
    }

    pub fn stop(&self, server_id: &ServerId) -> Result<(), WatchError> {
        let handle = self.watchers.lock().remove(server_id);
        match handle {
            Some(h) => {
                h.cancel.cancel();
                h.task.abort();
                Ok(())
            }
            None => Err(WatchError::NotWatching(server_id.clone())),
        }
    }

    pub fn stop_all(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        let mut watchers = self.watchers.lock();
        for (_, handle) in watchers.drain() {
            handle.cancel.cancel();
            handle.task.abort();
        }
    }

    pub fn is_watching(&self, server_id: &ServerId) -> bool {
        self.watchers.lock().contains_key(server_id)
    }
}

fn create_file_watcher(
    path: &std::path::Path,
    tx: mpsc::Sender<()>,
) -> Result<RecommendedWatcher, notify::Error> {
    let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
        if res.is_ok() {
            let _ = tx.blocking_send(());
        }
    })?;
    watcher.watch(path, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

async fn tail_loop(
    server_id: ServerId,
    path: PathBuf,
    parser: Arc<dyn LineParser>,
    event_tx: mpsc::UnboundedSender<LogEvent>,
    cancel: CancellationToken,
    poll_interval: Duration,
) {
    let mut reader = TailReader::new(path.clone());
    let (notify_tx, mut notify_rx) = mpsc::channel(32);
    let _watcher_guard = create_file_watcher(&path, notify_tx)
        .map_err(|e| {
            tracing::warn!(%server_id, error = %e, "file watcher failed, relying on poll fallback");
        })
        .ok();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(%server_id, "log tail watcher cancelled");
                break;
            }
            _ = notify_rx.recv() => {
                drain_lines(&server_id, &mut reader, &parser, &event_tx);
            }
            _ = tokio::time::sleep(poll_interval) => {
                drain_lines(&server_id, &mut reader, &parser, &event_tx);
            }
        }
    }
}

fn drain_lines(
    server_id: &ServerId,
    reader: &mut TailReader,
    parser: &Arc<dyn LineParser>,
    event_tx: &mpsc::UnboundedSender<LogEvent>,
) {
    for line in reader.read_new_lines() {
        let parsed = parser.parse(&line);
        let event = LogEvent {
            server_id: server_id.clone(),
            line,
            parsed,
        };
        if event_tx.send(event).is_err() {
            return;
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
