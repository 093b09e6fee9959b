// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron handler implementations wiring `CronJobKind::RestartServer` and
//! `BackupServer` to the container driver and the archive task generator.

use async_trait::async_trait;
use mc_container::ContainerDriver;
use mc_core::ServerId;
use mc_cron::{CronExecutionContext, CronHandler, CronJob, CronJobKind};
use mc_tasks::TaskManager;
use std::path::PathBuf;
use std::sync::Arc;

pub struct RestartHandler {
    driver: Arc<dyn ContainerDriver>,
}

impl RestartHandler {
    pub fn new(driver: Arc<dyn ContainerDriver>) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl CronHandler for RestartHandler {
    async fn run(&self, job: &CronJob, ctx: &CronExecutionContext) -> Result<String, String> {
        let server_id = restart_target(job)?;
        ctx.log(format!("stopping {server_id}"));
        self.driver.down(&server_id).await.map_err(|e| e.to_string())?;
        ctx.log(format!("starting {server_id}"));
        self.driver.up(&server_id).await.map_err(|e| e.to_string())?;
        Ok(format!("restarted {server_id}"))
    }
}

/// Triggers a backup by submitting an archive task to the shared task
/// manager rather than compressing inline — the cron firing returns as soon
/// as the task is queued, matching the "cron triggers jobs either directly
/// or via the task manager" data flow.
pub struct BackupHandler {
    tasks: Arc<TaskManager>,
    compose_root: PathBuf,
    archive_dir: PathBuf,
    archiver_binary: String,
}

impl BackupHandler {
    pub fn new(
        tasks: Arc<TaskManager>,
        compose_root: PathBuf,
        archive_dir: PathBuf,
        archiver_binary: String,
    ) -> Self {
        Self {
            tasks,
            compose_root,
            archive_dir,
            archiver_binary,
        }
    }
}

#[async_trait]
impl CronHandler for BackupHandler {
    async fn run(&self, job: &CronJob, ctx: &CronExecutionContext) -> Result<String, String> {
        let server_id = restart_target(job)?;
        let data_dir = self.compose_root.join(server_id.as_str()).join("data");
        let generator = mc_archive::create_archive_task(
            server_id.as_str().to_string(),
            data_dir,
            self.archive_dir.clone(),
            None,
            self.archiver_binary.clone(),
        );
        let submitted = self.tasks.submit(
            "archive_create",
            format!("scheduled backup of {server_id}"),
            Some(server_id.clone()),
            true,
            generator,
        );
        ctx.log(format!("submitted archive task {} for {server_id}", submitted.task_id));
        Ok(format!("submitted archive task {}", submitted.task_id))
    }
}

fn restart_target(job: &CronJob) -> Result<ServerId, String> {
    match &job.kind {
        CronJobKind::RestartServer { server_id } | CronJobKind::BackupServer { server_id } => {
            Ok(server_id.clone())
        }
        CronJobKind::Custom { name, .. } => Err(format!("no server target for custom job {name}")),
    }
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
