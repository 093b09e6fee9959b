// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Background task manager: submit a cancellable, progress-observable unit
//! of work and poll it to completion. A single `parking_lot`-guarded
//! `HashMap` holds one entry per in-flight unit of work; task bodies are
//! arbitrary progress-reporting generators rather than a fixed
//! step-machine job, since Rust has no native generators — task bodies
//! report progress over a channel instead.

use chrono::{DateTime, Utc};
use mc_core::{Categorize, Clock, ErrorCategory, TaskId};
use mc_core::{ServerId, SystemClock};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task {0} not found")]
    NotFound(TaskId),
    #[error("task {0} is not cancellable")]
    NotCancellable(TaskId),
    #[error("task {0} has not finished yet")]
    StillRunning(TaskId),
}

impl Categorize for TaskError {
    fn category(&self) -> ErrorCategory {
        match self {
            TaskError::NotFound(_) => ErrorCategory::NotFound,
            TaskError::NotCancellable(_) => ErrorCategory::InvalidInput,
            TaskError::StillRunning(_) => ErrorCategory::Conflict,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

/// A single progress update emitted by a running task.
#[derive(Debug, Clone)]
pub struct TaskProgress {
    pub progress: Option<u8>,
    pub message: String,
    pub result: Option<serde_json::Value>,
}

/// Durable view of a submitted task, returned by every query method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub task_type: String,
    pub name: String,
    pub server_id: Option<ServerId>,
    pub status: TaskStatus,
    /// `None` until the task body reports numeric progress at least once.
    pub progress: Option<u8>,
    pub message: String,
    pub cancellable: bool,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    /// Structured payload attached by the task body on its final progress
    /// report (e.g. an archive's filename and size); absent until then.
    pub result: Option<serde_json::Value>,
}

/// Handle a running task body uses to report progress and observe
/// cancellation requests.
#[derive(Clone)]
pub struct ProgressHandle {
    tx: mpsc::UnboundedSender<TaskProgress>,
    cancel: CancellationToken,
}

impl ProgressHandle {
    /// Report progress. `progress` is clamped into `0..=100`.
    pub fn report(&self, progress: u8, message: impl Into<String>) {
        let _ = self.tx.send(TaskProgress {
            progress: Some(progress.min(100)),
            message: message.into(),
            result: None,
        });
    }

    /// Report progress together with a structured result payload, for the
    /// final update of a task whose caller needs more than a message (an
    /// archive's filename, a snapshot id).
    pub fn report_with_result(
        &self,
        progress: u8,
        message: impl Into<String>,
        result: serde_json::Value,
    ) {
        let _ = self.tx.send(TaskProgress {
            progress: Some(progress.min(100)),
            message: message.into(),
            result: Some(result),
        });
    }

    /// Whether the caller has requested cancellation; cooperative task
    /// bodies should check this between units of work and return early.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// The token backing this task's cancellation signal. Task bodies that
    /// shell out to a subprocess (via `mc_exec::run_streaming` or similar)
    /// should pass this through instead of constructing a fresh token, so
    /// `TaskManager::cancel` actually reaches the running subprocess.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

type TaskFuture = Pin<Box<dyn Future<Output = Result<(), String>> + Send>>;

/// A unit of work: given a progress handle, returns a future that resolves
/// to `Ok(())` on success or `Err(message)` on failure. Implementations
/// should poll `handle.is_cancelled()` (or await `handle.cancelled()`)
/// between steps to honor cancellation promptly.
pub type TaskGenerator = Box<dyn FnOnce(ProgressHandle) -> TaskFuture + Send>;

pub struct SubmitResult {
    pub task_id: TaskId,
}

/// `parking_lot::Mutex`-guarded map of in-flight and completed tasks.
pub struct TaskManager<C: Clock = SystemClock> {
    clock: C,
    tasks: Arc<Mutex<HashMap<TaskId, TaskRecord>>>,
    cancel_tokens: Arc<Mutex<HashMap<TaskId, CancellationToken>>>,
}

impl TaskManager<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for TaskManager<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> TaskManager<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            tasks: Arc::new(Mutex::new(HashMap::new())),
            cancel_tokens: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Submit a new task. The task body starts running immediately on the
    /// tokio runtime; progress and terminal status are observable via
    /// [`TaskManager::get`] as soon as they're reported.
    pub fn submit(
        &self,
        task_type: impl Into<String>,
        name: impl Into<String>,
        server_id: Option<ServerId>,
        cancellable: bool,
        generator: TaskGenerator,
    ) -> SubmitResult {
        let task_id = TaskId::new(uuid::Uuid::new_v4().to_string());
        let now = self.clock.utc_now();
        let record = TaskRecord {
            id: task_id.clone(),
            task_type: task_type.into(),
            name: name.into(),
            server_id,
            status: TaskStatus::Pending,
            progress: None,
            message: String::new(),
            cancellable,
            created_at: now,
            started_at: None,
            ended_at: None,
            error: None,
            result: None,
        };
        self.tasks.lock().insert(task_id.clone(), record);

        let cancel = CancellationToken::new();
        self.cancel_tokens
            .lock()
            .insert(task_id.clone(), cancel.clone());

        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let handle = ProgressHandle {
            tx: progress_tx,
            cancel: cancel.clone(),
        };

        let tasks = Arc::clone(&self.tasks);
        let progress_task_id = task_id.clone();
        tokio::spawn(async move {
            while let Some(update) = progress_rx.recv().await {
                if let Some(record) = tasks.lock().get_mut(&progress_task_id) {
                    record.progress = update.progress;
                    record.message = update.message;
                    if update.result.is_some() {
                        record.result = update.result;
                    }
                }
            }
        });

        let tasks = Arc::clone(&self.tasks);
        let cancel_tokens = Arc::clone(&self.cancel_tokens);
        let body = generator(handle);
        let run_task_id = task_id.clone();
        let started_at = now;
        tokio::spawn(async move {
            if let Some(record) = tasks.lock().get_mut(&run_task_id) {
                record.status = TaskStatus::Running;
                record.started_at = Some(started_at);
            }
            let result = body.await;
            let was_cancelled = cancel_tokens
                .lock()
                .get(&run_task_id)
                .map(|t| t.is_cancelled())
                .unwrap_or(false);
            let mut tasks = tasks.lock();
            if let Some(record) = tasks.get_mut(&run_task_id) {
                record.ended_at = Some(Utc::now());
                match (was_cancelled, result) {
                    (true, _) => {
                        record.status = TaskStatus::Cancelled;
                        record.error = Some("cancelled".into());
                    }
                    (false, Ok(())) => {
                        record.status = TaskStatus::Completed;
                        if record.progress.is_some() {
                            record.progress = Some(100);
                        }
                    }
                    (false, Err(message)) => {
                        record.status = TaskStatus::Failed;
                        record.error = Some(message);
                    }
                }
            }
            cancel_tokens.lock().remove(&run_task_id);
        });

        SubmitResult { task_id }
    }

    pub fn get(&self, id: &TaskId) -> Option<TaskRecord> {
        self.tasks.lock().get(id).cloned()
    }

    pub fn list(&self) -> Vec<TaskRecord> {
        let mut records: Vec<_> = self.tasks.lock().values().cloned().collect();
        records.sort_by_key(|r| r.created_at);
        records
    }

    pub fn list_active(&self) -> Vec<TaskRecord> {
        self.list()
            .into_iter()
            .filter(|r| !r.status.is_terminal())
            .collect()
    }

    /// Request cancellation of a running task. Returns
    /// [`TaskError::NotCancellable`] if the task opted out, or
    /// [`TaskError::NotFound`] if it doesn't exist.
    pub fn cancel(&self, id: &TaskId) -> Result<(), TaskError> {
        let cancellable = self
            .tasks
            .lock()
            .get(id)
            .map(|r| r.cancellable)
            .ok_or_else(|| TaskError::NotFound(id.clone()))?;
        if !cancellable {
            return Err(TaskError::NotCancellable(id.clone()));
        }
        if let Some(token) = self.cancel_tokens.lock().get(id) {
            token.cancel();
        }
        Ok(())
    }

    /// Remove a terminal task's record. Fails if the task is still pending
    /// or running.
    pub fn remove(&self, id: &TaskId) -> Result<(), TaskError> {
        let mut tasks = self.tasks.lock();
        let status = tasks.get(id).map(|r| r.status).ok_or_else(|| TaskError::NotFound(id.clone()))?;
        if !status.is_terminal() {
            return Err(TaskError::StillRunning(id.clone()));
        }
        tasks.remove(id);
        Ok(())
    }

    /// Remove every task in a terminal state, returning how many were removed.
    pub fn clear_completed(&self) -> usize {
        let mut tasks = self.tasks.lock();
        let before = tasks.len();
        tasks.retain(|_, r| !r.status.is_terminal());
        before - tasks.len()
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
