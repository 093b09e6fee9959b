//! `mc` help and usage output.

use crate::prelude::*;

#[test]
fn mc_no_args_shows_usage_and_exits_nonzero() {
    cli().fails().stderr_has("Usage:");
}

#[test]
fn mc_help_shows_usage() {
    cli().args(&["--help"]).passes().stdout_has("Usage:");
}

#[test]
fn mc_version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("0.1");
}

#[test]
fn mc_cron_help_shows_subcommands() {
    cli()
        .args(&["cron", "--help"])
        .passes()
        .stdout_has("list")
        .stdout_has("pause")
        .stdout_has("resume")
        .stdout_has("cancel");
}

#[test]
fn mc_server_help_shows_subcommands() {
    cli()
        .args(&["server", "--help"])
        .passes()
        .stdout_has("list")
        .stdout_has("status");
}
