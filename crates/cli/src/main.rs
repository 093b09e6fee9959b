// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `mc` — a small operator CLI for smoke-testing the fleet control plane's
//! components from a terminal. Reads the same on-disk state the `mcd`
//! daemon owns rather than talking to a running daemon over IPC; an
//! HTTP/JSON API for remote operators is out of scope here.

use clap::{Parser, Subcommand};
use mc_container::{ContainerDriver, DockerComposeDriver};
use mc_cron::{CronManager, CronRegistry};
use mc_daemon::DaemonConfig;
use mc_tasks::TaskManager;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "mc", version, about = "Minecraft fleet control plane CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cron job inspection and control
    Cron {
        #[command(subcommand)]
        command: CronCommand,
    },
    /// Compose-backed server inspection
    Server {
        #[command(subcommand)]
        command: ServerCommand,
    },
    /// Run a one-off archive/snapshot task and wait for it to finish.
    ///
    /// Tasks live only for the duration of the `mc` invocation that submits
    /// them — there is no running daemon to hand them off to, so `ls` only
    /// ever shows the single task each of these subcommands just submitted.
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },
}

#[derive(Subcommand)]
enum CronCommand {
    /// List all cron jobs
    List,
    /// Pause a cron job
    Pause { job_id: String },
    /// Resume a paused cron job
    Resume { job_id: String },
    /// Cancel a cron job permanently
    Cancel { job_id: String },
}

#[derive(Subcommand)]
enum ServerCommand {
    /// List known servers
    List,
    /// Show a server's derived container status
    Status { server_id: String },
}

#[derive(Subcommand)]
enum TaskCommand {
    /// Extract an archive into a server's data directory
    ArchiveExtract {
        server_id: String,
        archive_path: PathBuf,
        /// Path relative to the server's data directory; defaults to its root
        dest: Option<String>,
    },
    /// Back up a server's data directory to the snapshot repository
    SnapshotBackup { server_id: String },
    /// Restore a snapshot into a server's data directory
    SnapshotRestore {
        snapshot_id: String,
        server_id: String,
        include_path: Option<String>,
    },
    /// List the tasks submitted by this invocation (always empty or one row)
    Ls,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = DaemonConfig::load()?;

    match cli.command {
        Commands::Cron { command } => run_cron_command(&config, command)?,
        Commands::Server { command } => run_server_command(&config, command).await?,
        Commands::Task { command } => run_task_command(&config, command).await?,
    }
    Ok(())
}

fn open_cron_manager(config: &DaemonConfig) -> Result<CronManager, Box<dyn std::error::Error>> {
    Ok(CronManager::open(
        config.state_dir.join("cronjobs.jsonl"),
        config.state_dir.join("cron_executions.jsonl"),
        CronRegistry::new(),
    )?)
}

fn run_cron_command(config: &DaemonConfig, command: CronCommand) -> Result<(), Box<dyn std::error::Error>> {
    let manager = open_cron_manager(config)?;
    match command {
        CronCommand::List => {
            for job in manager.list() {
                println!(
                    "{}\t{}\t{:?}\t{}\t{}",
                    job.id,
                    job.name,
                    job.status,
                    job.schedule,
                    job.next_run.map(|t| t.to_rfc3339()).unwrap_or_default()
                );
            }
        }
        CronCommand::Pause { job_id } => {
            manager.pause(&mc_core::CronJobId::new(job_id))?;
            println!("paused");
        }
        CronCommand::Resume { job_id } => {
            manager.resume(&mc_core::CronJobId::new(job_id))?;
            println!("resumed");
        }
        CronCommand::Cancel { job_id } => {
            manager.cancel(&mc_core::CronJobId::new(job_id))?;
            println!("cancelled");
        }
    }
    Ok(())
}

async fn run_server_command(
    config: &DaemonConfig,
    command: ServerCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    let driver = DockerComposeDriver::new(&config.compose_root);
    match command {
        ServerCommand::List => {
            for server in driver.list().await? {
                println!("{server}");
            }
        }
        ServerCommand::Status { server_id } => {
            let status = driver.status(&mc_core::ServerId::new(server_id)).await?;
            println!("{status:?}");
        }
    }
    Ok(())
}

fn snapshot_repo_config(config: &DaemonConfig) -> mc_snapshot::RepoConfig {
    mc_snapshot::RepoConfig {
        binary: config.snapshot_binary.clone(),
        repository: config.snapshot_repository.clone(),
        password: config.snapshot_password.clone().unwrap_or_default(),
    }
}

async fn run_task_command(
    config: &DaemonConfig,
    command: TaskCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    let manager = TaskManager::new();
    match command {
        TaskCommand::ArchiveExtract { server_id, archive_path, dest } => {
            let data_dir = config.compose_root.join(&server_id).join("data");
            let generator = mc_archive::create_extract_task(
                data_dir,
                archive_path,
                dest,
                config.archiver_binary.clone(),
            );
            let submitted = manager.submit(
                "archive_extract",
                format!("extract into {server_id}"),
                Some(mc_core::ServerId::new(server_id)),
                true,
                generator,
            );
            await_task(&manager, &submitted.task_id).await;
        }
        TaskCommand::SnapshotBackup { server_id } => {
            let data_dir = config.compose_root.join(&server_id).join("data");
            let generator = mc_snapshot::create_backup_task(snapshot_repo_config(config), data_dir);
            let submitted = manager.submit(
                "snapshot_backup",
                format!("backup {server_id}"),
                Some(mc_core::ServerId::new(server_id)),
                true,
                generator,
            );
            await_task(&manager, &submitted.task_id).await;
        }
        TaskCommand::SnapshotRestore {
            snapshot_id,
            server_id,
            include_path,
        } => {
            let data_dir = config.compose_root.join(&server_id).join("data");
            let generator = mc_snapshot::create_restore_task(
                snapshot_repo_config(config),
                snapshot_id,
                data_dir,
                include_path,
            );
            let submitted = manager.submit(
                "snapshot_restore",
                format!("restore into {server_id}"),
                Some(mc_core::ServerId::new(server_id)),
                true,
                generator,
            );
            await_task(&manager, &submitted.task_id).await;
        }
        TaskCommand::Ls => {
            for task in manager.list() {
                println!("{}\t{}\t{:?}\t{}", task.id, task.task_type, task.status, task.message);
            }
        }
    }
    Ok(())
}

/// Poll a just-submitted task to completion, printing each new progress
/// message as it arrives. There is no other process that could observe this
/// task, so blocking here until it finishes is the whole point.
async fn await_task(manager: &TaskManager, task_id: &mc_core::TaskId) {
    let mut last_message = String::new();
    loop {
        let Some(record) = manager.get(task_id) else {
            return;
        };
        if record.message != last_message {
            let percent = record
                .progress
                .map(|p| p.to_string())
                .unwrap_or_else(|| "?".to_string());
            println!("[{percent}%] {}", record.message);
            last_message = record.message.clone();
        }
        if record.status.is_terminal() {
            match record.status {
                mc_tasks::TaskStatus::Completed => {
                    let result = record.result.map(|r| r.to_string()).unwrap_or_default();
                    println!("completed: {result}");
                }
                mc_tasks::TaskStatus::Failed => {
                    eprintln!("failed: {}", record.error.unwrap_or_default());
                }
                mc_tasks::TaskStatus::Cancelled => println!("cancelled"),
                mc_tasks::TaskStatus::Pending | mc_tasks::TaskStatus::Running => {}
            }
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
