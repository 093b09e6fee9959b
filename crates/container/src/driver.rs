// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container driver: one compose project per server, shelled out to the
//! `docker compose` CLI via a narrow adapter trait.

use crate::compose::{ComposeError, ComposeSpec};
use crate::lifecycle::RawContainerState;
use async_trait::async_trait;
use mc_core::{Categorize, ErrorCategory, ServerId};
use mc_exec::{ExecError, ExecOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Timeout applied to every `docker compose` invocation other than `logs`,
/// which streams indefinitely and is bounded by the caller's own duration.
pub const COMPOSE_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("no compose project registered for server {0}")]
    UnknownServer(ServerId),
    #[error(transparent)]
    InvalidCompose(#[from] ComposeError),
    #[error("compose command failed: {0}")]
    Exec(#[from] ExecError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Categorize for ContainerError {
    fn category(&self) -> ErrorCategory {
        match self {
            ContainerError::UnknownServer(_) => ErrorCategory::NotFound,
            ContainerError::InvalidCompose(_) => ErrorCategory::InvalidInput,
            ContainerError::Exec(e) => e.category(),
            ContainerError::Io(_) => ErrorCategory::Unavailable,
        }
    }
}

/// Capability surface a compose-backed fleet driver exposes. Kept as a
/// trait so the daemon wiring and tests can swap in a fake implementation.
#[async_trait]
pub trait ContainerDriver: Send + Sync {
    async fn create(&self, server: &ServerId) -> Result<(), ContainerError>;
    async fn up(&self, server: &ServerId) -> Result<(), ContainerError>;
    async fn down(&self, server: &ServerId) -> Result<(), ContainerError>;
    async fn remove(&self, server: &ServerId) -> Result<(), ContainerError>;
    async fn status(&self, server: &ServerId) -> Result<RawContainerState, ContainerError>;
    async fn list(&self) -> Result<Vec<ServerId>, ContainerError>;
    async fn logs_tail_path(&self, server: &ServerId) -> Result<PathBuf, ContainerError>;
    async fn exec_rcon(&self, server: &ServerId, command: &str) -> Result<String, ContainerError>;
    async fn compose_spec(&self, server: &ServerId) -> Result<ComposeSpec, ContainerError>;
}

/// [`ContainerDriver`] implementation shelling out to `docker compose`.
///
/// Each server gets its own project directory `<root>/<server_id>/` with a
/// `compose.yaml` file, and its own compose project name `mc-<server_id>`
/// so `docker compose` never conflates two servers' containers.
pub struct DockerComposeDriver {
    root: PathBuf,
}

impl DockerComposeDriver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn project_dir(&self, server: &ServerId) -> PathBuf {
        self.root.join(server.as_str())
    }

    fn compose_file(&self, server: &ServerId) -> PathBuf {
        self.project_dir(server).join("compose.yaml")
    }

    fn project_name(&self, server: &ServerId) -> String {
        format!("mc-{}", server.as_str())
    }

    fn base_command(&self, server: &ServerId) -> Command {
        let mut cmd = Command::new("docker");
        cmd.arg("compose")
            .arg("-f")
            .arg(self.compose_file(server))
            .arg("-p")
            .arg(self.project_name(server));
        cmd
    }

    async fn run(&self, server: &ServerId, args: &[&str], description: &str) -> Result<String, ContainerError> {
        let mut cmd = self.base_command(server);
        cmd.args(args);
        let mut output = String::new();
        let outcome = mc_exec::run_streaming(
            cmd,
            description,
            ExecOptions {
                timeout: Some(COMPOSE_COMMAND_TIMEOUT),
                ..ExecOptions::default()
            },
            CancellationToken::new(),
            |line| {
                output.push_str(line);
                output.push('\n');
            },
        )
        .await?;
        Ok(outcome.combined_output)
    }
}

#[async_trait]
impl ContainerDriver for DockerComposeDriver {
    async fn create(&self, server: &ServerId) -> Result<(), ContainerError> {
        require_project(&self.compose_file(server), server)?;
        self.run(server, &["create"], "docker compose create").await?;
        Ok(())
    }

    async fn up(&self, server: &ServerId) -> Result<(), ContainerError> {
        require_project(&self.compose_file(server), server)?;
        self.run(server, &["up", "-d"], "docker compose up").await?;
        Ok(())
    }

    async fn down(&self, server: &ServerId) -> Result<(), ContainerError> {
        self.run(server, &["stop"], "docker compose stop").await?;
        Ok(())
    }

    async fn remove(&self, server: &ServerId) -> Result<(), ContainerError> {
        self.run(server, &["down", "--remove-orphans"], "docker compose down")
            .await?;
        Ok(())
    }

    async fn status(&self, server: &ServerId) -> Result<RawContainerState, ContainerError> {
        let project_dir = self.project_dir(server);
        if !project_dir.exists() {
            return Ok(RawContainerState::Removed);
        }
        let output = self
            .run(
                server,
                &["ps", "--all", "--format", "json"],
                "docker compose ps",
            )
            .await?;
        Ok(parse_ps_state(&output))
    }

    async fn list(&self) -> Result<Vec<ServerId>, ContainerError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut servers = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    servers.push(ServerId::new(name));
                }
            }
        }
        servers.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(servers)
    }

    async fn logs_tail_path(&self, server: &ServerId) -> Result<PathBuf, ContainerError> {
        let path = self.project_dir(server).join("logs").join("latest.log");
        Ok(path)
    }

    async fn exec_rcon(&self, server: &ServerId, command: &str) -> Result<String, ContainerError> {
        let spec = self.compose_spec(server).await?;
        let (service_name, _service) = spec
            .services
            .iter()
            .next()
            .ok_or_else(|| ContainerError::UnknownServer(server.clone()))?;
        self.run(
            server,
            &["exec", "-T", service_name, "rcon-cli", command],
            "docker compose exec rcon-cli",
        )
        .await
    }

    async fn compose_spec(&self, server: &ServerId) -> Result<ComposeSpec, ContainerError> {
        let path = self.compose_file(server);
        let spec = ComposeSpec::load(&path)?;
        spec.validate()?;
        Ok(spec)
    }
}

fn require_project(compose_file: &Path, server: &ServerId) -> Result<(), ContainerError> {
    if !compose_file.exists() {
        return Err(ContainerError::UnknownServer(server.clone()));
    }
    Ok(())
}

/// Parse `docker compose ps --format json` output (one JSON object per
/// line, or a single JSON array depending on compose version) into the
/// coarse [`RawContainerState`] this crate tracks.
fn parse_ps_state(output: &str) -> RawContainerState {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return RawContainerState::Exists;
    }
    let entries: Vec<serde_json::Value> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).unwrap_or_default()
    } else {
        trimmed
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    };
    let Some(first) = entries.first() else {
        return RawContainerState::Exists;
    };
    match first.get("State").and_then(|v| v.as_str()) {
        Some("running") => RawContainerState::Running,
        Some(_) => RawContainerState::Created,
        None => RawContainerState::Exists,
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
