// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron manager: persisted schedule store, closed handler registry, and a
//! tick-driven scheduler loop: poll a table of next-deadlines each tick,
//! fire what's due, and let each entry recompute its own next deadline
//! from a real cron expression.

use crate::model::{CronExecution, CronJob, CronJobKind, CronJobStatus, ExecutionStatus};
use crate::registry::{CronExecutionContext, CronRegistry};
use crate::restart_slot::{
    find_next_available_restart_time, generate_restart_cron, RestartSlotInput, SlotKind,
};
use chrono::{DateTime, Utc};
use mc_core::{Categorize, CronJobId, ErrorCategory, ExecutionId, ServerId};
use mc_storage::{RowStore, StoreError};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum CronError {
    #[error("invalid cron schedule {schedule:?}: {reason}")]
    InvalidSchedule { schedule: String, reason: String },
    #[error("no handler registered for cron job kind {0:?}")]
    UnknownKind(String),
    #[error("cron job {0} not found")]
    NotFound(CronJobId),
    #[error("cron job {0} is cancelled and cannot be modified")]
    Cancelled(CronJobId),
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl Categorize for CronError {
    fn category(&self) -> ErrorCategory {
        match self {
            CronError::InvalidSchedule { .. } => ErrorCategory::InvalidInput,
            CronError::UnknownKind(_) => ErrorCategory::InvalidInput,
            CronError::NotFound(_) => ErrorCategory::NotFound,
            CronError::Cancelled(_) => ErrorCategory::Conflict,
            CronError::Storage(_) => ErrorCategory::Unavailable,
        }
    }
}

/// Parse a 5-field unix cron expression (prepending a zero seconds field,
/// since the `cron` crate's grammar is seconds-first) and return its next
/// firing time strictly after `after`.
pub fn next_run_after(schedule: &str, after: DateTime<Utc>) -> Result<DateTime<Utc>, String> {
    let field_count = schedule.split_whitespace().count();
    let full_expr = if field_count == 5 {
        format!("0 {schedule}")
    } else {
        schedule.to_string()
    };
    let parsed: cron::Schedule = full_expr.parse().map_err(|e| format!("{e}"))?;
    parsed
        .after(&after)
        .next()
        .ok_or_else(|| "schedule never fires again".to_string())
}

/// Build the slot-finder's view of every non-cancelled job, for both the
/// auto-slotting and re-slotting entry points.
fn slot_inputs<'a>(jobs: impl Iterator<Item = &'a CronJob>) -> Vec<RestartSlotInput<'a>> {
    jobs.filter(|j| j.status != CronJobStatus::Cancelled)
        .map(|j| RestartSlotInput {
            kind: match &j.kind {
                CronJobKind::RestartServer { .. } => SlotKind::RestartServer,
                CronJobKind::BackupServer { .. } => SlotKind::BackupServer,
                CronJobKind::Custom { .. } => SlotKind::Other,
            },
            minute_field: j.minute_field(),
            hour_field: j.hour_field(),
            server_id: j.kind.server_id(),
        })
        .collect()
}

pub struct CronManager {
    jobs: Mutex<RowStore<CronJob>>,
    executions: Mutex<RowStore<CronExecution>>,
    registry: CronRegistry,
}

impl CronManager {
    /// Open the persisted job/execution stores and reinstate `next_run`
    /// for every job still `Active`, reconciling state on startup rather
    /// than trusting whatever was last written before a crash.
    pub fn open(
        jobs_path: impl AsRef<Path>,
        executions_path: impl AsRef<Path>,
        registry: CronRegistry,
    ) -> Result<Self, CronError> {
        let mut jobs = RowStore::<CronJob>::open(jobs_path.as_ref())?;
        let executions = RowStore::<CronExecution>::open(executions_path.as_ref())?;

        let now = Utc::now();
        let stale: Vec<CronJob> = jobs
            .values()
            .filter(|j| j.status == CronJobStatus::Active && j.next_run.is_none())
            .cloned()
            .collect();
        for mut job in stale {
            match next_run_after(&job.schedule, now) {
                Ok(next_run) => {
                    job.next_run = Some(next_run);
                    jobs.put(job)?;
                }
                Err(reason) => {
                    warn!(job_id = %job.id, reason, "dropping unparsable schedule on reload");
                }
            }
        }

        Ok(Self {
            jobs: Mutex::new(jobs),
            executions: Mutex::new(executions),
            registry,
        })
    }

    /// Register a new job with an explicit cron schedule.
    pub fn register(
        &self,
        name: impl Into<String>,
        kind: CronJobKind,
        schedule: impl Into<String>,
    ) -> Result<CronJobId, CronError> {
        let schedule = schedule.into();
        if !self.registry.contains(kind.registry_key()) {
            return Err(CronError::UnknownKind(kind.registry_key().to_string()));
        }
        let next_run = next_run_after(&schedule, Utc::now()).map_err(|reason| {
            CronError::InvalidSchedule {
                schedule: schedule.clone(),
                reason,
            }
        })?;

        let now = Utc::now();
        let job = CronJob {
            id: CronJobId::new(uuid::Uuid::new_v4().to_string()),
            name: name.into(),
            kind,
            schedule,
            status: CronJobStatus::Active,
            created_at: now,
            updated_at: now,
            next_run: Some(next_run),
            execution_count: 0,
        };
        let id = job.id.clone();
        self.jobs.lock().put(job)?;
        Ok(id)
    }

    /// Register a `restart_server` job, picking its restart slot
    /// automatically so it doesn't collide with any existing backup
    /// minute or restart slot.
    pub fn register_restart_with_auto_slot(
        &self,
        name: impl Into<String>,
        server_id: ServerId,
        start_from: DateTime<Utc>,
    ) -> Result<CronJobId, CronError> {
        let jobs = self.jobs.lock();
        let inputs = slot_inputs(jobs.values());
        let slot = find_next_available_restart_time(&inputs, start_from, None);
        drop(jobs);

        self.register(
            name,
            CronJobKind::RestartServer { server_id },
            generate_restart_cron(slot),
        )
    }

    /// Re-slot an existing `restart_server` job to the next available time
    /// at or after `start_from`, excluding the job's own current slot from
    /// conflict consideration so "move mine" never collides with itself.
    pub fn reslot_restart(&self, id: &CronJobId, start_from: DateTime<Utc>) -> Result<(), CronError> {
        let mut jobs = self.jobs.lock();
        let mut job = jobs.get(id).cloned().ok_or_else(|| CronError::NotFound(id.clone()))?;
        if job.status == CronJobStatus::Cancelled {
            return Err(CronError::Cancelled(id.clone()));
        }
        let server_id = match &job.kind {
            CronJobKind::RestartServer { server_id } => server_id.clone(),
            other => {
                return Err(CronError::InvalidSchedule {
                    schedule: job.schedule.clone(),
                    reason: format!("job kind {} is not a restart_server job", other.registry_key()),
                })
            }
        };

        let inputs = slot_inputs(jobs.values());
        let slot = find_next_available_restart_time(&inputs, start_from, Some(&server_id));

        job.schedule = generate_restart_cron(slot);
        job.updated_at = Utc::now();
        if job.status == CronJobStatus::Active {
            job.next_run = next_run_after(&job.schedule, Utc::now()).ok();
        }
        jobs.put(job)?;
        Ok(())
    }

    pub fn get(&self, id: &CronJobId) -> Option<CronJob> {
        self.jobs.lock().get(id).cloned()
    }

    pub fn list(&self) -> Vec<CronJob> {
        let mut jobs: Vec<_> = self.jobs.lock().values().cloned().collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        jobs
    }

    pub fn executions_for(&self, cronjob_id: &CronJobId) -> Vec<CronExecution> {
        let mut executions: Vec<_> = self
            .executions
            .lock()
            .values()
            .filter(|e| &e.cronjob_id == cronjob_id)
            .cloned()
            .collect();
        executions.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        executions
    }

    pub fn pause(&self, id: &CronJobId) -> Result<(), CronError> {
        self.set_status(id, CronJobStatus::Paused)
    }

    pub fn resume(&self, id: &CronJobId) -> Result<(), CronError> {
        let mut jobs = self.jobs.lock();
        let mut job = jobs.get(id).cloned().ok_or_else(|| CronError::NotFound(id.clone()))?;
        if job.status == CronJobStatus::Cancelled {
            return Err(CronError::Cancelled(id.clone()));
        }
        job.status = CronJobStatus::Active;
        job.next_run = next_run_after(&job.schedule, Utc::now()).ok();
        job.updated_at = Utc::now();
        jobs.put(job)?;
        Ok(())
    }

    pub fn cancel(&self, id: &CronJobId) -> Result<(), CronError> {
        self.set_status(id, CronJobStatus::Cancelled)
    }

    fn set_status(&self, id: &CronJobId, status: CronJobStatus) -> Result<(), CronError> {
        let mut jobs = self.jobs.lock();
        let mut job = jobs.get(id).cloned().ok_or_else(|| CronError::NotFound(id.clone()))?;
        if job.status == CronJobStatus::Cancelled {
            return Err(CronError::Cancelled(id.clone()));
        }
        job.status = status;
        if status != CronJobStatus::Active {
            job.next_run = None;
        }
        job.updated_at = Utc::now();
        jobs.put(job)?;
        Ok(())
    }

    /// Fire every `Active` job whose `next_run` is due at or before `now`.
    /// Each firing runs concurrently with the tick loop and with every
    /// other firing; a storage error or handler failure on one job is
    /// logged and isolated rather than aborting the rest of the tick.
    /// Returns how many jobs were fired.
    pub async fn tick(self: &Arc<Self>, now: DateTime<Utc>) -> usize {
        let due: Vec<CronJob> = {
            let jobs = self.jobs.lock();
            jobs.values()
                .filter(|j| j.status == CronJobStatus::Active)
                .filter(|j| j.next_run.map(|n| n <= now).unwrap_or(false))
                .cloned()
                .collect()
        };

        let mut firings = JoinSet::new();
        for job in due.clone() {
            let manager = Arc::clone(self);
            firings.spawn(async move {
                let job_id = job.id.clone();
                if let Err(err) = manager.fire(&job, now).await {
                    error!(job_id = %job_id, error = %err, "cron job firing failed to persist");
                }
            });
        }
        while let Some(joined) = firings.join_next().await {
            if let Err(err) = joined {
                error!(error = %err, "cron job firing task panicked");
            }
        }
        due.len()
    }

    async fn fire(&self, job: &CronJob, now: DateTime<Utc>) -> Result<(), CronError> {
        let execution_id = ExecutionId::new(uuid::Uuid::new_v4().to_string());
        let mut execution = CronExecution {
            id: execution_id.clone(),
            cronjob_id: job.id.clone(),
            started_at: now,
            ended_at: None,
            status: ExecutionStatus::Running,
            output: None,
            error: None,
            duration_ms: None,
            messages: Vec::new(),
        };
        self.executions.lock().put(execution.clone())?;

        let ctx = CronExecutionContext::new(job.kind.params());
        let handler = self.registry.get(job.kind.registry_key());
        let result = match handler {
            Some(handler) => handler.run(job, &ctx).await,
            None => Err(format!("no handler registered for {}", job.kind.registry_key())),
        };

        let ended_at = Utc::now();
        execution.ended_at = Some(ended_at);
        execution.duration_ms = Some((ended_at - execution.started_at).num_milliseconds().max(0) as u64);
        execution.messages = ctx.into_messages();
        let succeeded = result.is_ok();
        match result {
            Ok(output) => {
                info!(job_id = %job.id, "cron job fired successfully");
                execution.status = ExecutionStatus::Succeeded;
                execution.output = Some(output);
            }
            Err(message) => {
                error!(job_id = %job.id, error = %message, "cron job handler failed");
                execution.status = ExecutionStatus::Failed;
                execution.error = Some(message);
            }
        }
        self.executions.lock().put(execution)?;

        let mut jobs = self.jobs.lock();
        if let Some(mut stored) = jobs.get(&job.id).cloned() {
            if succeeded {
                stored.execution_count += 1;
            }
            stored.updated_at = Utc::now();
            if stored.status == CronJobStatus::Active {
                stored.next_run = next_run_after(&stored.schedule, now).ok();
            }
            jobs.put(stored)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
