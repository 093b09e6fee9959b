// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet control plane daemon (`mcd`).
//!
//! Owns the long-lived singletons — task manager, cron manager, container
//! driver, log tail dispatcher — and runs until SIGTERM/SIGINT.

use mc_container::{ContainerDriver, DockerComposeDriver};
use mc_cron::{CronManager, CronRegistry};
use mc_daemon::handlers::{BackupHandler, RestartHandler};
use mc_daemon::{ContainerFleetSource, DaemonConfig};
use mc_dns::{DnsReconciler, HttpDnsProvider, HttpL7Router, ReconcilerConfig};
use mc_logtail::LogTailDispatcher;
use mc_tasks::TaskManager;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Delay after a successful reconcile push before the next poll cycle.
const DNS_POST_PUSH_DELAY: Duration = Duration::from_secs(2);

/// How often the fleet source's game-port cache is refreshed from the
/// container driver.
const FLEET_SOURCE_REFRESH_INTERVAL: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = DaemonConfig::load()?;
    std::fs::create_dir_all(&config.state_dir)?;
    std::fs::create_dir_all(&config.compose_root)?;
    std::fs::create_dir_all(&config.archive_dir)?;

    let _log_guard = mc_daemon::logging::init(&config)?;
    info!("starting fleet control plane daemon");

    let driver: Arc<dyn ContainerDriver> = Arc::new(DockerComposeDriver::new(&config.compose_root));
    let tasks = Arc::new(TaskManager::new());

    let mut registry = CronRegistry::new();
    registry.register("restart_server", Arc::new(RestartHandler::new(driver.clone())));
    registry.register(
        "backup_server",
        Arc::new(BackupHandler::new(
            tasks.clone(),
            config.compose_root.clone(),
            config.archive_dir.clone(),
            config.archiver_binary.clone(),
        )),
    );

    let cron = Arc::new(CronManager::open(
        config.state_dir.join("cronjobs.jsonl"),
        config.state_dir.join("cron_executions.jsonl"),
        registry,
    )?);

    let (log_event_tx, mut log_event_rx) = tokio::sync::mpsc::unbounded_channel();
    let logtail = Arc::new(LogTailDispatcher::new(log_event_tx));
    tokio::spawn(async move {
        while let Some(event) = log_event_rx.recv().await {
            tracing::debug!(server_id = %event.server_id, line = %event.line, "log line");
        }
    });

    let dns_cancel = CancellationToken::new();
    let dns_task = if config.router_base_url.is_empty() || config.dns_domain.is_empty() {
        info!("dns reconciler not configured (router_base_url/dns_domain empty), skipping");
        None
    } else {
        let fleet_source = Arc::new(ContainerFleetSource::new(driver.clone()));
        let refresh_source = fleet_source.clone();
        let refresh_cancel = dns_cancel.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(FLEET_SOURCE_REFRESH_INTERVAL);
            loop {
                tokio::select! {
                    _ = refresh_cancel.cancelled() => return,
                    _ = interval.tick() => refresh_source.refresh().await,
                }
            }
        });

        let token = mc_daemon::env::dns_api_token();
        let provider = Arc::new(HttpDnsProvider::new(
            config.router_base_url.clone(),
            config.dns_domain.clone(),
            token.clone(),
        ));
        let router = Arc::new(HttpL7Router::new(config.router_base_url.clone(), token));
        let reconciler = Arc::new(DnsReconciler::new(
            provider,
            router,
            fleet_source,
            ReconcilerConfig {
                managed_sub: config.dns_managed_sub.clone(),
                domain: config.dns_domain.clone(),
                addresses: HashMap::new(),
                poll_interval: config.dns_poll_interval,
                post_push_delay: DNS_POST_PUSH_DELAY,
                backoff_floor: config.dns_backoff_floor,
                backoff_cap: config.dns_backoff_cap,
            },
        ));
        let run_cancel = dns_cancel.clone();
        Some(tokio::spawn(async move { reconciler.run(run_cancel).await }))
    };

    let cron_loop = Arc::clone(&cron);
    let cron_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
        loop {
            interval.tick().await;
            let now = chrono::Utc::now();
            cron_loop.tick(now).await;
        }
    });

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!("daemon ready");
    println!("READY");

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    cron_task.abort();
    dns_cancel.cancel();
    if let Some(task) = dns_task {
        let _ = task.await;
    }
    logtail.stop_all();
    info!("daemon stopped");
    Ok(())
}
