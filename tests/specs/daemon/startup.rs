//! `mcd` startup and graceful shutdown.

use crate::prelude::*;
use std::fs::File;
use std::process::{Command, Stdio};

#[test]
fn daemon_prints_ready_then_exits_on_sigterm() {
    let fleet = Fleet::empty();
    let stdout_path = fleet.state_path().join("mcd.stdout");
    let stdout_file = File::create(&stdout_path).unwrap();

    let mut child = Command::new(mcd_binary())
        .env("MC_STATE_DIR", fleet.state_path())
        .stdout(Stdio::from(stdout_file))
        .stderr(Stdio::null())
        .spawn()
        .expect("mcd should spawn");

    let ready = wait_for(3000, || {
        std::fs::read_to_string(&stdout_path)
            .map(|s| s.contains("READY"))
            .unwrap_or(false)
    });
    assert!(ready, "daemon never printed READY");

    // SIGTERM via `kill`; avoids pulling in a signals crate just for tests.
    Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .expect("kill should run");

    let exited = wait_for(3000, || matches!(child.try_wait(), Ok(Some(_))));
    assert!(exited, "daemon did not exit after SIGTERM");
}
