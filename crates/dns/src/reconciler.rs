// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The reconciler loop: poll + queue-drain, both funneled through a single
//! mutex-guarded `try_update` so pushes never overlap, with an
//! exponential backoff that resets on a successful push (including a
//! successful no-op cycle) and grows 1.5x, capped, on any collaborator
//! error.

use crate::diff::{compute_dns_diff, compute_route_diff, desired_routes};
use crate::model::{ActualState, AddressSource, DesiredState, NewRecord, ResolvedAddress, UpdateRecord};
use crate::provider::{DnsProvider, ProviderError};
use crate::router::{L7Router, RouterError};
use mc_core::ServerId;
use parking_lot::Mutex as SyncMutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Router(#[from] RouterError),
}

/// What the desired-state assembler needs to enumerate the fleet. A
/// narrow trait so the reconciler doesn't depend on `mc-container`
/// directly; `mc-daemon` wires the real container driver into it.
pub trait FleetSource: Send + Sync {
    fn game_ports(&self) -> HashMap<ServerId, u16>;
}

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub managed_sub: String,
    pub domain: String,
    pub addresses: HashMap<String, AddressSource>,
    pub poll_interval: Duration,
    pub post_push_delay: Duration,
    pub backoff_floor: Duration,
    pub backoff_cap: Duration,
}

struct Backoff {
    floor: Duration,
    cap: Duration,
    current: SyncMutex<Duration>,
}

impl Backoff {
    fn new(floor: Duration, cap: Duration) -> Self {
        Self {
            floor,
            cap,
            current: SyncMutex::new(floor),
        }
    }

    fn reset(&self) {
        *self.current.lock() = self.floor;
    }

    fn grow(&self) -> Duration {
        let mut current = self.current.lock();
        let next = current.mul_f64(1.5).min(self.cap);
        *current = next;
        next
    }

    fn current(&self) -> Duration {
        *self.current.lock()
    }
}

/// Reconciles DNS records and L7 routes to match the live fleet. Owns
/// its own backoff timer and update-queue counter; no other component
/// writes to either.
pub struct DnsReconciler<P, R, F> {
    provider: Arc<P>,
    router: Arc<R>,
    fleet: Arc<F>,
    config: ReconcilerConfig,
    backoff: Backoff,
    queue: AtomicU64,
    push_lock: AsyncMutex<()>,
}

impl<P, R, F> DnsReconciler<P, R, F>
where
    P: DnsProvider,
    R: L7Router,
    F: FleetSource,
{
    pub fn new(provider: Arc<P>, router: Arc<R>, fleet: Arc<F>, config: ReconcilerConfig) -> Self {
        let backoff = Backoff::new(config.backoff_floor, config.backoff_cap);
        Self {
            provider,
            router,
            fleet,
            config,
            backoff,
            queue: AtomicU64::new(0),
            push_lock: AsyncMutex::new(()),
        }
    }

    /// Bump the update queue. Many calls between drains coalesce into a
    /// single extra push opportunity; the counter is strictly decremented
    /// per drained cycle, never zeroed wholesale.
    pub fn queue_update(&self) {
        self.queue.fetch_add(1, Ordering::SeqCst);
    }

    fn assemble_desired(&self) -> DesiredState {
        let servers = self.fleet.game_ports();
        let mut addresses = HashMap::new();
        let natmap: HashMap<String, ResolvedAddress> = HashMap::new();
        for (name, source) in &self.config.addresses {
            match crate::diff::resolve_address(source, &natmap) {
                Some(resolved) => {
                    addresses.insert(name.clone(), resolved);
                }
                None => {
                    warn!(address = %name, "dropping address with no resolvable target this cycle");
                }
            }
        }
        DesiredState { addresses, servers }
    }

    async fn assemble_actual(&self) -> Result<ActualState, ReconcileError> {
        let sub = &self.config.managed_sub;
        let domain = &self.config.domain;
        let records = self
            .provider
            .list_records()
            .await?
            .into_iter()
            .filter(|r| is_managed_sub(&r.sub, sub))
            .collect();
        let routes = self
            .router
            .get_routes()
            .await?
            .into_iter()
            .filter(|(vhost, _)| vhost.ends_with(&format!(".{sub}.{domain}")))
            .collect();
        Ok(ActualState { records, routes })
    }

    /// Run one reconciliation cycle: assemble desired+actual, diff, push
    /// if non-empty. Returns whether anything was pushed.
    pub async fn try_update(&self) -> Result<bool, ReconcileError> {
        let _guard = self.push_lock.lock().await;

        let desired = self.assemble_desired();
        let actual = self.assemble_actual().await?;

        let dns_diff = compute_dns_diff(
            &desired,
            &actual,
            &self.config.managed_sub,
            &self.config.domain,
            self.provider.supports_native_update(),
        );
        let desired_route_table = desired_routes(&desired, &self.config.managed_sub, &self.config.domain);
        let route_diff = compute_route_diff(&desired_route_table, &actual.routes);

        if dns_diff.is_empty() && route_diff.is_empty() {
            debug!("dns reconcile cycle: desired already matches actual, no-op");
            return Ok(false);
        }

        info!(
            dns_add = dns_diff.add.len(),
            dns_remove = dns_diff.remove.len(),
            dns_update = dns_diff.update.len(),
            route_changes = route_diff.add.len() + route_diff.remove.len() + route_diff.update.len(),
            "pushing dns/route changes"
        );

        let dns_push = async {
            if !dns_diff.remove.is_empty() {
                self.provider.remove_records(&dns_diff.remove).await?;
            }
            if !dns_diff.update.is_empty() {
                let updates: Vec<UpdateRecord> = dns_diff
                    .update
                    .iter()
                    .cloned()
                    .map(|u| UpdateRecord {
                        id: u.id,
                        sub: u.sub,
                        record_type: u.record_type,
                        value: u.value,
                        ttl: u.ttl,
                    })
                    .collect();
                self.provider.update_records(&updates).await?;
            }
            if !dns_diff.add.is_empty() {
                let news: Vec<NewRecord> = dns_diff.add.iter().cloned().map(Into::into).collect();
                self.provider.add_records(&news).await?;
            }
            Ok::<(), ProviderError>(())
        };

        let route_push = async {
            if !route_diff.is_empty() {
                self.router.override_routes(desired_route_table.clone()).await?;
            }
            Ok::<(), RouterError>(())
        };

        let (dns_result, route_result) = tokio::join!(dns_push, route_push);
        dns_result?;
        route_result?;

        Ok(true)
    }

    /// Drive the poll-loop and queue-drain concurrently until `cancel` is
    /// signalled, awaiting any in-flight push before returning.
    pub async fn run(&self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("dns reconciler stopping");
                    return;
                }
                _ = sleep(self.config.poll_interval) => {
                    self.run_one_cycle().await;
                }
                _ = self.wait_for_queued_update(&cancel) => {
                    self.run_one_cycle().await;
                }
            }
        }
    }

    async fn wait_for_queued_update(&self, cancel: &CancellationToken) {
        loop {
            if self.queue.load(Ordering::SeqCst) > 0 {
                return;
            }
            if cancel.is_cancelled() {
                return;
            }
            sleep(Duration::from_millis(50)).await;
        }
    }

    async fn run_one_cycle(&self) {
        let had_queued = self.queue.load(Ordering::SeqCst) > 0;
        if had_queued {
            self.queue.fetch_sub(1, Ordering::SeqCst);
        }

        match self.try_update().await {
            Ok(_) => {
                self.backoff.reset();
                sleep(self.config.post_push_delay).await;
            }
            Err(err) => {
                let backoff = self.backoff.grow();
                warn!(error = %err, backoff_secs = backoff.as_secs_f64(), "dns reconcile cycle failed");
                sleep(backoff).await;
            }
        }
    }

    #[cfg(test)]
    fn current_backoff(&self) -> Duration {
        self.backoff.current()
    }
}

fn is_managed_sub(record_sub: &str, managed_sub: &str) -> bool {
    record_sub == managed_sub
        || record_sub == format!("*.{managed_sub}")
        || (record_sub.starts_with("*.") && record_sub.ends_with(&format!(".{managed_sub}")))
        || (record_sub.starts_with("_minecraft._tcp.") && record_sub.ends_with(managed_sub))
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;
