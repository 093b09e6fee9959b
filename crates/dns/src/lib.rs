// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DNS + L7 routing reconciler: keeps a managed subdomain's records and a
//! router's vhost table in lock-step with the live fleet.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod diff;
pub mod http;
pub mod model;
pub mod provider;
pub mod reconciler;
pub mod router;

pub use diff::{compute_dns_diff, compute_route_diff, desired_routes, resolve_address};
pub use http::{HttpDnsProvider, HttpL7Router};
pub use model::{
    ActualState, AddressSource, DesiredState, DnsDiff, DnsRecord, NewRecord, RecordType,
    ResolvedAddress, RouteDiff, UpdateRecord,
};
pub use provider::{DnsProvider, ProviderError};
pub use reconciler::{DnsReconciler, FleetSource, ReconcilerConfig, ReconcileError};
pub use router::{L7Router, RouterError};

use mc_core::{Categorize, ErrorCategory};

impl Categorize for ProviderError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Unavailable
    }
}

impl Categorize for RouterError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Unavailable
    }
}

impl Categorize for ReconcileError {
    fn category(&self) -> ErrorCategory {
        match self {
            ReconcileError::Provider(e) => e.category(),
            ReconcileError::Router(e) => e.category(),
        }
    }
}
