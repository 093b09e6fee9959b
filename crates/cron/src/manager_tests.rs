// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use async_trait::async_trait;
use chrono::Timelike;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

struct CountingHandler {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl CronHandler for CountingHandler {
    async fn run(&self, _job: &CronJob, ctx: &CronExecutionContext) -> Result<String, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ctx.log("ran");
        Ok("ok".into())
    }
}

struct FailingHandler;

#[async_trait]
impl CronHandler for FailingHandler {
    async fn run(&self, _job: &CronJob, _ctx: &CronExecutionContext) -> Result<String, String> {
        Err("boom".into())
    }
}

fn registry(calls: Arc<AtomicUsize>) -> CronRegistry {
    let mut registry = CronRegistry::new();
    registry.register("restart_server", Arc::new(CountingHandler { calls }));
    registry.register("backup_server", Arc::new(FailingHandler));
    registry
}

#[test]
fn next_run_after_accepts_five_field_expressions() {
    let now = Utc::now();
    let next = next_run_after("*/5 * * * *", now).unwrap();
    assert!(next > now);
}

#[test]
fn next_run_after_rejects_garbage() {
    assert!(next_run_after("not a schedule", Utc::now()).is_err());
}

#[test]
fn register_rejects_unknown_kind() {
    let dir = tempdir().unwrap();
    let manager = CronManager::open(
        dir.path().join("jobs.jsonl"),
        dir.path().join("executions.jsonl"),
        CronRegistry::new(),
    )
    .unwrap();

    let err = manager.register(
        "nightly",
        CronJobKind::RestartServer {
            server_id: ServerId::new("s1"),
        },
        "0 4 * * *",
    );
    assert!(matches!(err, Err(CronError::UnknownKind(_))));
}

#[test]
fn register_rejects_invalid_schedule() {
    let dir = tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let manager = CronManager::open(
        dir.path().join("jobs.jsonl"),
        dir.path().join("executions.jsonl"),
        registry(calls),
    )
    .unwrap();

    let err = manager.register(
        "nightly",
        CronJobKind::RestartServer {
            server_id: ServerId::new("s1"),
        },
        "nonsense",
    );
    assert!(matches!(err, Err(CronError::InvalidSchedule { .. })));
}

#[tokio::test]
async fn tick_fires_due_job_and_records_success() {
    let dir = tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let manager = Arc::new(
        CronManager::open(
            dir.path().join("jobs.jsonl"),
            dir.path().join("executions.jsonl"),
            registry(calls.clone()),
        )
        .unwrap(),
    );

    let id = manager
        .register(
            "nightly-restart",
            CronJobKind::RestartServer {
                server_id: ServerId::new("s1"),
            },
            "* * * * *",
        )
        .unwrap();

    let job = manager.get(&id).unwrap();
    let due_at = job.next_run.unwrap();
    let fired = manager.tick(due_at).await;
    assert_eq!(fired, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let executions = manager.executions_for(&id);
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].status, ExecutionStatus::Succeeded);
    assert_eq!(executions[0].messages, vec!["ran".to_string()]);
    assert!(executions[0].duration_ms.is_some());

    let reloaded = manager.get(&id).unwrap();
    assert!(reloaded.next_run.unwrap() > due_at);
    assert_eq!(reloaded.execution_count, 1);
}

#[tokio::test]
async fn tick_records_failure_without_aborting_other_jobs() {
    let dir = tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let manager = Arc::new(
        CronManager::open(
            dir.path().join("jobs.jsonl"),
            dir.path().join("executions.jsonl"),
            registry(calls.clone()),
        )
        .unwrap(),
    );

    let failing_id = manager
        .register(
            "nightly-backup",
            CronJobKind::BackupServer {
                server_id: ServerId::new("s1"),
            },
            "* * * * *",
        )
        .unwrap();
    let ok_id = manager
        .register(
            "nightly-restart",
            CronJobKind::RestartServer {
                server_id: ServerId::new("s2"),
            },
            "* * * * *",
        )
        .unwrap();

    let due_at = manager.get(&ok_id).unwrap().next_run.unwrap();
    let fired = manager.tick(due_at).await;
    assert_eq!(fired, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let failing_executions = manager.executions_for(&failing_id);
    assert_eq!(failing_executions[0].status, ExecutionStatus::Failed);
    assert_eq!(failing_executions[0].error.as_deref(), Some("boom"));
}

#[test]
fn pause_resume_and_cancel_transitions() {
    let dir = tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let manager = CronManager::open(
        dir.path().join("jobs.jsonl"),
        dir.path().join("executions.jsonl"),
        registry(calls),
    )
    .unwrap();

    let id = manager
        .register(
            "nightly-restart",
            CronJobKind::RestartServer {
                server_id: ServerId::new("s1"),
            },
            "0 4 * * *",
        )
        .unwrap();

    manager.pause(&id).unwrap();
    assert_eq!(manager.get(&id).unwrap().status, CronJobStatus::Paused);
    assert!(manager.get(&id).unwrap().next_run.is_none());

    manager.resume(&id).unwrap();
    assert_eq!(manager.get(&id).unwrap().status, CronJobStatus::Active);
    assert!(manager.get(&id).unwrap().next_run.is_some());

    manager.cancel(&id).unwrap();
    assert_eq!(manager.get(&id).unwrap().status, CronJobStatus::Cancelled);
    assert!(matches!(manager.pause(&id), Err(CronError::Cancelled(_))));
    assert!(matches!(manager.resume(&id), Err(CronError::Cancelled(_))));
}

#[test]
fn register_restart_with_auto_slot_avoids_existing_backup_minute() {
    let dir = tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let manager = CronManager::open(
        dir.path().join("jobs.jsonl"),
        dir.path().join("executions.jsonl"),
        registry(calls),
    )
    .unwrap();

    manager
        .register(
            "backup-s1",
            CronJobKind::BackupServer {
                server_id: ServerId::new("s1"),
            },
            "0 * * * *",
        )
        .unwrap();

    let start = Utc::now();
    let restart_id = manager
        .register_restart_with_auto_slot("restart-s2", ServerId::new("s2"), start)
        .unwrap();

    let job = manager.get(&restart_id).unwrap();
    assert_ne!(job.minute_field(), "0");
}

#[test]
fn reslot_restart_moves_job_without_conflicting_with_its_own_slot() {
    let dir = tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let manager = CronManager::open(
        dir.path().join("jobs.jsonl"),
        dir.path().join("executions.jsonl"),
        registry(calls),
    )
    .unwrap();

    let id = manager
        .register(
            "restart-s1",
            CronJobKind::RestartServer {
                server_id: ServerId::new("s1"),
            },
            "0 6 * * *",
        )
        .unwrap();

    let before = manager.get(&id).unwrap();

    let window_start = Utc::now().with_hour(6).unwrap().with_minute(0).unwrap();
    manager.reslot_restart(&id, window_start).unwrap();

    let after = manager.get(&id).unwrap();
    // Re-slotting onto the same window with no other jobs registered lands
    // back on the job's own current slot, since it's excluded from conflict.
    assert_eq!(after.minute_field(), "0");
    assert_eq!(after.hour_field(), "6");
    assert!(after.updated_at >= before.updated_at);
}

#[test]
fn reopening_store_reinstates_next_run_for_active_jobs() {
    let dir = tempdir().unwrap();
    let jobs_path = dir.path().join("jobs.jsonl");
    let executions_path = dir.path().join("executions.jsonl");

    {
        let calls = Arc::new(AtomicUsize::new(0));
        let manager =
            CronManager::open(&jobs_path, &executions_path, registry(calls)).unwrap();
        manager
            .register(
                "nightly-restart",
                CronJobKind::RestartServer {
                    server_id: ServerId::new("s1"),
                },
                "0 4 * * *",
            )
            .unwrap();
    }

    let calls = Arc::new(AtomicUsize::new(0));
    let reopened = CronManager::open(&jobs_path, &executions_path, registry(calls)).unwrap();
    let jobs = reopened.list();
    assert_eq!(jobs.len(), 1);
    assert!(jobs[0].next_run.is_some());
}
