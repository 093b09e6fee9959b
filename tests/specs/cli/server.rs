//! `mc server` against an isolated, empty fleet state directory.

use crate::prelude::*;

#[test]
fn list_with_no_compose_root_prints_nothing() {
    let fleet = Fleet::empty();
    let stdout = fleet.mc().args(&["server", "list"]).passes().stdout();
    assert!(stdout.is_empty(), "expected no servers, got: {stdout}");
}

#[test]
fn list_shows_known_compose_projects() {
    let fleet = Fleet::empty();
    fleet.server_dir("alpha");
    fleet.server_dir("bravo");
    let stdout = fleet.mc().args(&["server", "list"]).passes().stdout();
    assert!(stdout.contains("alpha"));
    assert!(stdout.contains("bravo"));
}

#[test]
fn status_of_unknown_server_is_removed() {
    let fleet = Fleet::empty();
    fleet
        .mc()
        .args(&["server", "status", "ghost"])
        .passes()
        .stdout_has("Removed");
}
