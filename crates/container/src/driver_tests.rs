// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parse_ps_state_reads_running_from_json_array() {
    let output = r#"[{"Name":"mc-foo","State":"running"}]"#;
    assert_eq!(parse_ps_state(output), RawContainerState::Running);
}

#[test]
fn parse_ps_state_reads_running_from_jsonl() {
    let output = "{\"Name\":\"mc-foo\",\"State\":\"exited\"}\n";
    assert_eq!(parse_ps_state(output), RawContainerState::Created);
}

#[test]
fn parse_ps_state_treats_empty_output_as_exists() {
    assert_eq!(parse_ps_state(""), RawContainerState::Exists);
}

#[tokio::test]
async fn status_of_unknown_server_is_removed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let driver = DockerComposeDriver::new(dir.path());
    let status = driver
        .status(&mc_core::ServerId::new("ghost"))
        .await
        .expect("status never fails for an unknown server");
    assert_eq!(status, RawContainerState::Removed);
}

#[tokio::test]
async fn list_is_empty_when_root_does_not_exist() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing_root = dir.path().join("does-not-exist");
    let driver = DockerComposeDriver::new(missing_root);
    let servers = driver.list().await.expect("list tolerates missing root");
    assert!(servers.is_empty());
}

#[tokio::test]
async fn create_on_missing_project_is_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let driver = DockerComposeDriver::new(dir.path());
    let err = driver
        .create(&mc_core::ServerId::new("missing"))
        .await
        .expect_err("no compose.yaml written yet");
    assert!(matches!(err, ContainerError::UnknownServer(_)));
}
