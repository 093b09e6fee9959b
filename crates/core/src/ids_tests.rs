// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn server_id_displays_as_its_string() {
    let id = ServerId::new("survival-1");
    assert_eq!(id.to_string(), "survival-1");
}

#[test]
fn task_id_default_is_empty() {
    let id = TaskId::default();
    assert_eq!(id.as_str(), "");
}

#[test]
fn distinct_id_types_do_not_compare() {
    let server = ServerId::new("a");
    let cron = CronJobId::new("a");
    // Different newtypes: compiles only because both Display to "a", not because
    // they're interchangeable. This test exists to pin Display, not equality.
    assert_eq!(server.to_string(), cron.to_string());
}
