// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process wiring for the fleet control plane: configuration, logging, and
//! the long-lived singletons (task manager, cron manager, container
//! driver, log tail dispatcher) the `mcd` binary owns.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod env;
pub mod fleet_source;
pub mod handlers;
pub mod logging;

pub use config::{ConfigError, DaemonConfig};
pub use fleet_source::ContainerFleetSource;
pub use handlers::{BackupHandler, RestartHandler};
