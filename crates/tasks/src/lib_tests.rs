// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

fn succeeding_task() -> TaskGenerator {
    Box::new(|handle| {
        Box::pin(async move {
            handle.report(50, "halfway");
            tokio::time::sleep(Duration::from_millis(10)).await;
            handle.report(90, "almost done");
            Ok(())
        })
    })
}

fn failing_task(message: &'static str) -> TaskGenerator {
    Box::new(move |_handle| Box::pin(async move { Err(message.to_string()) }))
}

fn cancellable_task() -> TaskGenerator {
    Box::new(|handle| {
        Box::pin(async move {
            handle.cancelled().await;
            Ok(())
        })
    })
}

fn silent_succeeding_task() -> TaskGenerator {
    Box::new(|_handle| Box::pin(async move { Ok(()) }))
}

async fn wait_for_terminal<C: Clock>(manager: &TaskManager<C>, id: &TaskId) -> TaskRecord {
    for _ in 0..200 {
        if let Some(record) = manager.get(id) {
            if record.status.is_terminal() {
                return record;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("task {id} never reached a terminal state");
}

#[tokio::test]
async fn submitted_task_completes_with_progress_clamped_to_100() {
    let manager = TaskManager::new();
    let result = manager.submit("backup", "nightly backup", None, true, succeeding_task());
    let record = wait_for_terminal(&manager, &result.task_id).await;
    assert_eq!(record.status, TaskStatus::Completed);
    assert_eq!(record.progress, Some(100));
    assert!(record.started_at.is_some());
    assert!(record.ended_at.is_some());
}

#[tokio::test]
async fn completed_task_that_never_reported_progress_stays_none() {
    let manager = TaskManager::new();
    let result = manager.submit("archive", "quiet task", None, false, silent_succeeding_task());
    let record = wait_for_terminal(&manager, &result.task_id).await;
    assert_eq!(record.status, TaskStatus::Completed);
    assert_eq!(record.progress, None);
}

#[tokio::test]
async fn failing_task_is_marked_failed_with_message() {
    let manager = TaskManager::new();
    let result = manager.submit("archive", "compress world", None, true, failing_task("disk full"));
    let record = wait_for_terminal(&manager, &result.task_id).await;
    assert_eq!(record.status, TaskStatus::Failed);
    assert_eq!(record.error.as_deref(), Some("disk full"));
}

#[tokio::test]
async fn cancel_marks_task_cancelled_once_it_observes_the_token() {
    let manager = TaskManager::new();
    let result = manager.submit("snapshot", "restic backup", None, true, cancellable_task());
    // Give the spawned task a moment to reach the `Running` state before cancelling.
    tokio::time::sleep(Duration::from_millis(10)).await;
    manager.cancel(&result.task_id).expect("cancellable task");
    let record = wait_for_terminal(&manager, &result.task_id).await;
    assert_eq!(record.status, TaskStatus::Cancelled);
    assert_eq!(record.error.as_deref(), Some("cancelled"));
}

#[tokio::test]
async fn cancel_on_non_cancellable_task_is_rejected() {
    let manager = TaskManager::new();
    let result = manager.submit("archive", "compress world", None, false, cancellable_task());
    let err = manager.cancel(&result.task_id).expect_err("not cancellable");
    assert!(matches!(err, TaskError::NotCancellable(_)));
}

#[tokio::test]
async fn remove_fails_while_task_is_still_running() {
    let manager = TaskManager::new();
    let result = manager.submit("snapshot", "restic backup", None, true, cancellable_task());
    let err = manager.remove(&result.task_id).expect_err("still running");
    assert!(matches!(err, TaskError::StillRunning(_)));
    manager.cancel(&result.task_id).expect("cancellable");
}

#[tokio::test]
async fn clear_completed_removes_only_terminal_tasks() {
    let manager = TaskManager::new();
    let done = manager.submit("backup", "a", None, true, succeeding_task());
    let running = manager.submit("snapshot", "b", None, true, cancellable_task());
    wait_for_terminal(&manager, &done.task_id).await;

    let removed = manager.clear_completed();
    assert_eq!(removed, 1);
    assert!(manager.get(&done.task_id).is_none());
    assert!(manager.get(&running.task_id).is_some());

    manager.cancel(&running.task_id).expect("cancellable");
}

#[tokio::test]
async fn list_active_excludes_terminal_tasks() {
    let manager = TaskManager::new();
    let done = manager.submit("backup", "a", None, true, succeeding_task());
    wait_for_terminal(&manager, &done.task_id).await;
    let running = manager.submit("snapshot", "b", None, true, cancellable_task());

    let active = manager.list_active();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, running.task_id);

    manager.cancel(&running.task_id).expect("cancellable");
}
