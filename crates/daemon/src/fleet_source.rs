// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bridges the async [`ContainerDriver`] to the DNS reconciler's sync
//! [`FleetSource`] trait via a periodically-refreshed cache, since
//! `game_ports()` is called from a non-async context.

use mc_container::ContainerDriver;
use mc_core::ServerId;
use mc_dns::FleetSource;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

pub struct ContainerFleetSource {
    driver: Arc<dyn ContainerDriver>,
    ports: RwLock<HashMap<ServerId, u16>>,
}

impl ContainerFleetSource {
    pub fn new(driver: Arc<dyn ContainerDriver>) -> Self {
        Self {
            driver,
            ports: RwLock::new(HashMap::new()),
        }
    }

    /// Re-enumerate servers and their configured game ports. Servers with
    /// no parseable compose spec are dropped silently from the map rather
    /// than failing the whole refresh.
    pub async fn refresh(&self) {
        let servers = match self.driver.list().await {
            Ok(servers) => servers,
            Err(err) => {
                warn!(error = %err, "fleet source: failed to list servers");
                return;
            }
        };

        let mut next = HashMap::new();
        for server in servers {
            match self.driver.compose_spec(&server).await {
                Ok(spec) => {
                    if let Some(port) = spec.game_host_port() {
                        next.insert(server, port);
                    }
                }
                Err(err) => {
                    warn!(server_id = %server, error = %err, "fleet source: failed to read compose spec");
                }
            }
        }
        *self.ports.write() = next;
    }
}

impl FleetSource for ContainerFleetSource {
    fn game_ports(&self) -> HashMap<ServerId, u16> {
        self.ports.read().clone()
    }
}

#[cfg(test)]
#[path = "fleet_source_tests.rs"]
mod tests;
