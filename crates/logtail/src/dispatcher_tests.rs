// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::parser::PassthroughParser;
use std::time::Duration;
use tokio::time::timeout;

fn dispatcher() -> (LogTailDispatcher, mpsc::UnboundedReceiver<LogEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        LogTailDispatcher::with_poll_interval(tx, Duration::from_millis(20)),
        rx,
    )
}

#[tokio::test]
async fn watch_twice_errors_already_watching() {
    let (dispatcher, _rx) = dispatcher();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("latest.log");
    std::fs::write(&path, "").unwrap();
    let server = ServerId::new("s1");

    dispatcher
        .watch(server.clone(), path.clone(), Arc::new(PassthroughParser))
        .unwrap();
    let err = dispatcher
        .watch(server.clone(), path, Arc::new(PassthroughParser))
        .unwrap_err();
    assert!(matches!(err, WatchError::AlreadyWatching(_)));
    dispatcher.stop_all();
}

#[tokio::test]
async fn stop_unknown_server_errors_not_watching() {
    let (dispatcher, _rx) = dispatcher();
    let err = dispatcher.stop(&ServerId::new("ghost")).unwrap_err();
    assert!(matches!(err, WatchError::NotWatching(_)));
}

#[tokio::test]
async fn stop_all_refuses_new_watchers() {
    let (dispatcher, _rx) = dispatcher();
    dispatcher.stop_all();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("latest.log");
    std::fs::write(&path, "").unwrap();
    let err = dispatcher
        .watch(ServerId::new("s1"), path, Arc::new(PassthroughParser))
        .unwrap_err();
    assert!(matches!(err, WatchError::Stopped));
}

#[tokio::test]
async fn watched_server_emits_events_in_file_order() {
    let (dispatcher, mut rx) = dispatcher();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("latest.log");
    std::fs::write(&path, "").unwrap();
    let server = ServerId::new("s1");

    dispatcher
        .watch(server.clone(), path.clone(), Arc::new(PassthroughParser))
        .unwrap();

    std::fs::write(&path, "first\nsecond\nthird\n").unwrap();

    let mut lines = Vec::new();
    while lines.len() < 3 {
        let event = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for log event")
            .expect("channel closed");
        assert_eq!(event.server_id, server);
        lines.push(event.line);
    }
    assert_eq!(lines, vec!["first", "second", "third"]);

    dispatcher.stop(&server).unwrap();
}

#[tokio::test]
async fn stop_removes_watcher_so_it_can_be_rewatched() {
    let (dispatcher, _rx) = dispatcher();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("latest.log");
    std::fs::write(&path, "").unwrap();
    let server = ServerId::new("s1");

    dispatcher
        .watch(server.clone(), path.clone(), Arc::new(PassthroughParser))
        .unwrap();
    assert!(dispatcher.is_watching(&server));
    dispatcher.stop(&server).unwrap();
    assert!(!dispatcher.is_watching(&server));
    dispatcher
        .watch(server, path, Arc::new(PassthroughParser))
        .unwrap();
}
