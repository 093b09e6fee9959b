//! `mc cron` against an isolated, empty fleet state directory.

use crate::prelude::*;

#[test]
fn list_on_empty_fleet_prints_nothing() {
    let fleet = Fleet::empty();
    fleet.mc().args(&["cron", "list"]).passes().stdout_has("");
    let stdout = fleet.mc().args(&["cron", "list"]).passes().stdout();
    assert!(stdout.is_empty(), "expected no cron jobs, got: {stdout}");
}

#[test]
fn pause_unknown_job_fails() {
    let fleet = Fleet::empty();
    fleet
        .mc()
        .args(&["cron", "pause", "nonexistent-job"])
        .fails();
}

#[test]
fn resume_unknown_job_fails() {
    let fleet = Fleet::empty();
    fleet
        .mc()
        .args(&["cron", "resume", "nonexistent-job"])
        .fails();
}

#[test]
fn cancel_unknown_job_fails() {
    let fleet = Fleet::empty();
    fleet
        .mc()
        .args(&["cron", "cancel", "nonexistent-job"])
        .fails();
}
