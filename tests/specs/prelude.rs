//! Test helpers for behavioral specifications.
//!
//! Black-box CLI testing: spawn the `mc`/`mcd` binaries and assert on
//! stdout, stderr, and exit codes against an isolated state directory.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Returns the path to a binary, checking llvm-cov target directory first.
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

fn mc_binary() -> PathBuf {
    binary_path("mc")
}

pub fn mcd_binary() -> PathBuf {
    binary_path("mcd")
}

/// Create a CLI builder for `mc` commands.
pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

pub struct CliBuilder {
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<Path>) -> Self {
        self.envs.push((key.to_string(), value.as_ref().to_string_lossy().to_string()));
        self
    }

    pub fn command(self) -> Command {
        let mut cmd = Command::new(mc_binary());
        cmd.args(&self.args);
        cmd.env_remove("MC_STATE_DIR");
        for (key, value) in self.envs {
            cmd.env(key, value);
        }
        cmd
    }

    pub fn passes(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    pub fn fails(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            !output.status.success(),
            "expected command to fail, but it passed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }
}

pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            stdout.contains(expected),
            "stdout does not contain '{}'\nstdout: {}",
            expected,
            stdout
        );
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(
            stderr.contains(expected),
            "stderr does not contain '{}'\nstderr: {}",
            expected,
            stderr
        );
        self
    }
}

/// Isolated fleet state directory for a single test.
pub struct Fleet {
    state_dir: tempfile::TempDir,
}

impl Fleet {
    pub fn empty() -> Self {
        Self {
            state_dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn state_path(&self) -> &Path {
        self.state_dir.path()
    }

    /// Run an `mc` command scoped to this fleet's state directory.
    pub fn mc(&self) -> CliBuilder {
        cli().env("MC_STATE_DIR", self.state_path())
    }

    /// Write a compose project directory so the container driver sees a
    /// known server without needing a real `docker` binary for `list`.
    pub fn server_dir(&self, server_id: &str) -> PathBuf {
        let dir = self.state_path().join("servers").join(server_id);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}

/// Poll a condition until it returns true or timeout is reached.
pub fn wait_for<F>(timeout_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
    false
}
