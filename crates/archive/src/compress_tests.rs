// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mc_tasks::TaskManager;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn parses_percent_from_progress_line() {
    assert_eq!(parse_percent("  42% 3 + world/level.dat"), Some(42));
    assert_eq!(parse_percent("Everything is Ok"), None);
    assert_eq!(parse_percent("100%"), Some(100));
}

#[test]
fn resolve_source_rejects_missing_path() {
    let dir = tempdir().unwrap();
    let err = resolve_source(dir.path(), Some("/nonexistent")).unwrap_err();
    assert!(matches!(err, ArchiveError::SourceMissing(_)));
}

#[test]
fn resolve_source_rejects_escape_above_data_dir() {
    let dir = tempdir().unwrap();
    let data_dir = dir.path().join("data");
    std::fs::create_dir_all(&data_dir).unwrap();
    std::fs::write(dir.path().join("secret.txt"), b"nope").unwrap();

    let err = resolve_source(&data_dir, Some("../secret.txt")).unwrap_err();
    assert!(matches!(err, ArchiveError::SourceMissing(_) | ArchiveError::PathEscape(_)));
}

#[test]
fn resolve_source_accepts_root() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("test.txt"), b"hello").unwrap();
    let resolved = resolve_source(dir.path(), None).unwrap();
    assert_eq!(resolved, dir.path());
}

fn has_binary(name: &str) -> bool {
    std::process::Command::new(name)
        .arg("--help")
        .output()
        .is_ok()
}

#[tokio::test]
async fn archive_task_compresses_and_reports_result() {
    if !has_binary("7z") {
        return;
    }
    let root = tempdir().unwrap();
    let data_dir = root.path().join("data");
    std::fs::create_dir_all(&data_dir).unwrap();
    std::fs::write(data_dir.join("test.txt"), b"test content").unwrap();
    let archive_dir = root.path().join("archives");
    std::fs::create_dir_all(&archive_dir).unwrap();

    let manager = TaskManager::new();
    let generator = create_archive_task(
        "test_server".into(),
        data_dir,
        archive_dir.clone(),
        None,
        "7z".into(),
    );
    let submitted = manager.submit("archive_create", "test_server", None, true, generator);

    let record = loop {
        if let Some(record) = manager.get(&submitted.task_id) {
            if record.status.is_terminal() {
                break record;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    };

    assert_eq!(record.status, mc_tasks::TaskStatus::Completed);
    let result = record.result.expect("result payload");
    let filename = result["filename"].as_str().unwrap();
    assert!(archive_dir.join(filename).exists());
    assert!(result["size"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn archive_task_fails_on_missing_source() {
    let root = tempdir().unwrap();
    let data_dir = root.path().join("data");
    std::fs::create_dir_all(&data_dir).unwrap();
    let archive_dir = root.path().join("archives");
    std::fs::create_dir_all(&archive_dir).unwrap();

    let manager = TaskManager::new();
    let generator = create_archive_task(
        "test_server".into(),
        data_dir,
        archive_dir,
        Some("/nonexistent".into()),
        "7z".into(),
    );
    let submitted = manager.submit("archive_create", "test_server", None, true, generator);

    let record = loop {
        if let Some(record) = manager.get(&submitted.task_id) {
            if record.status.is_terminal() {
                break record;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    };

    assert_eq!(record.status, mc_tasks::TaskStatus::Failed);
    assert!(record.error.unwrap().contains("does not exist"));
}

#[test]
fn resolve_destination_rejects_escape_above_data_dir() {
    let dir = tempdir().unwrap();
    let data_dir = dir.path().join("data");
    std::fs::create_dir_all(&data_dir).unwrap();

    let err = resolve_destination(&data_dir, Some("../outside")).unwrap_err();
    assert!(matches!(err, ArchiveError::DestinationEscape(_)));
}

#[test]
fn resolve_destination_accepts_root_even_when_absent() {
    let dir = tempdir().unwrap();
    let data_dir = dir.path().join("data");
    let resolved = resolve_destination(&data_dir, None).unwrap();
    assert_eq!(resolved, data_dir);
}

#[tokio::test]
async fn extract_task_fails_on_missing_archive() {
    let root = tempdir().unwrap();
    let data_dir = root.path().join("data");
    std::fs::create_dir_all(&data_dir).unwrap();

    let manager = TaskManager::new();
    let generator = create_extract_task(
        data_dir,
        root.path().join("nonexistent.7z"),
        None,
        "7z".into(),
    );
    let submitted = manager.submit("archive_extract", "test_server", None, true, generator);

    let record = loop {
        if let Some(record) = manager.get(&submitted.task_id) {
            if record.status.is_terminal() {
                break record;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    };

    assert_eq!(record.status, mc_tasks::TaskStatus::Failed);
    assert!(record.error.unwrap().contains("does not exist"));
}

#[tokio::test]
async fn extract_task_round_trips_an_archive_created_by_archive_task() {
    if !has_binary("7z") {
        return;
    }
    let root = tempdir().unwrap();
    let data_dir = root.path().join("data");
    std::fs::create_dir_all(&data_dir).unwrap();
    std::fs::write(data_dir.join("test.txt"), b"test content").unwrap();
    let archive_dir = root.path().join("archives");
    std::fs::create_dir_all(&archive_dir).unwrap();

    let manager = TaskManager::new();
    let create_generator = create_archive_task(
        "test_server".into(),
        data_dir,
        archive_dir.clone(),
        None,
        "7z".into(),
    );
    let submitted = manager.submit("archive_create", "test_server", None, true, create_generator);
    let created = loop {
        if let Some(record) = manager.get(&submitted.task_id) {
            if record.status.is_terminal() {
                break record;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    };
    let filename = created.result.unwrap()["filename"].as_str().unwrap().to_string();

    let restore_dir = root.path().join("restored");
    std::fs::create_dir_all(&restore_dir).unwrap();
    let extract_generator = create_extract_task(
        restore_dir.clone(),
        archive_dir.join(&filename),
        None,
        "7z".into(),
    );
    let submitted = manager.submit("archive_extract", "test_server", None, true, extract_generator);
    let extracted = loop {
        if let Some(record) = manager.get(&submitted.task_id) {
            if record.status.is_terminal() {
                break record;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    };

    assert_eq!(extracted.status, mc_tasks::TaskStatus::Completed);
    assert_eq!(
        std::fs::read(restore_dir.join("test.txt")).unwrap(),
        b"test content"
    );
}
