// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted cron job and execution records.

use chrono::{DateTime, Utc};
use mc_core::{CronJobId, ExecutionId, ServerId};
use mc_storage::Keyed;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CronJobStatus {
    Active,
    Paused,
    Cancelled,
}

/// The closed set of things a cron job can do. New kinds require a new
/// variant (and a matching [`crate::registry::CronHandler`] registration)
/// rather than an open-ended string, so the scheduler can never fire a job
/// whose handler doesn't exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CronJobKind {
    RestartServer { server_id: ServerId },
    BackupServer { server_id: ServerId },
    Custom { name: String, payload: serde_json::Value },
}

impl CronJobKind {
    pub fn registry_key(&self) -> &'static str {
        match self {
            CronJobKind::RestartServer { .. } => "restart_server",
            CronJobKind::BackupServer { .. } => "backup_server",
            CronJobKind::Custom { .. } => "custom",
        }
    }

    pub fn server_id(&self) -> Option<&ServerId> {
        match self {
            CronJobKind::RestartServer { server_id } | CronJobKind::BackupServer { server_id } => {
                Some(server_id)
            }
            CronJobKind::Custom { .. } => None,
        }
    }

    /// The parameters handed to a firing's [`crate::registry::CronExecutionContext`],
    /// so a handler can see what it was invoked with without re-deriving it
    /// from the job's `kind` by hand.
    pub fn params(&self) -> serde_json::Value {
        match self {
            CronJobKind::RestartServer { server_id } => {
                serde_json::json!({ "server_id": server_id })
            }
            CronJobKind::BackupServer { server_id } => {
                serde_json::json!({ "server_id": server_id })
            }
            CronJobKind::Custom { name, payload } => {
                serde_json::json!({ "name": name, "payload": payload })
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronJob {
    pub id: CronJobId,
    pub name: String,
    pub kind: CronJobKind,
    /// Standard 5-field cron expression (`min hour dom month dow`), with an
    /// optional leading seconds field (6 fields) when sub-minute precision
    /// is needed.
    pub schedule: String,
    pub status: CronJobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub next_run: Option<DateTime<Utc>>,
    /// How many times this job has fired to a `Succeeded` execution.
    pub execution_count: u64,
}

impl Keyed for CronJob {
    type Key = CronJobId;
    fn key(&self) -> Self::Key {
        self.id.clone()
    }
}

impl CronJob {
    /// The cron expression's minute field (first field).
    pub fn minute_field(&self) -> &str {
        self.schedule.split_whitespace().next().unwrap_or("*")
    }

    /// The cron expression's hour field (second field).
    pub fn hour_field(&self) -> &str {
        self.schedule.split_whitespace().nth(1).unwrap_or("*")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronExecution {
    pub id: ExecutionId,
    pub cronjob_id: CronJobId,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: ExecutionStatus,
    pub output: Option<String>,
    pub error: Option<String>,
    pub duration_ms: Option<u64>,
    /// Structured log lines a handler emitted via `CronExecutionContext::log`
    /// while it ran, in emission order.
    pub messages: Vec<String>,
}

impl Keyed for CronExecution {
    type Key = ExecutionId;
    fn key(&self) -> Self::Key {
        self.id.clone()
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
