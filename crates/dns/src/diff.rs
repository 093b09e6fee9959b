// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Desired/actual diffing for DNS records and L7 routes. Records compare
//! equal by `(sub, type, value, ttl)`, id-agnostic. Collaborator failures
//! propagate to the caller rather than being absorbed here — only the
//! reconciler's outer loop decides to log and back off instead of
//! crashing.

use crate::model::{
    ActualState, AddressSource, DesiredState, DnsDiff, DnsRecord, NewRecordEq, RecordType,
    ResolvedAddress, RouteDiff, UpdateRecordEq,
};
use mc_core::ServerId;
use std::collections::HashMap;

/// Subdomain naming scheme: `*.<sub>` (unnamed default address),
/// `*.<name>.<sub>` (named address), `_minecraft._tcp.<server>.<sub>`.
pub fn wildcard_sub(sub: &str) -> String {
    format!("*.{sub}")
}

pub fn named_wildcard_sub(sub: &str, name: &str) -> String {
    format!("*.{name}.{sub}")
}

pub fn srv_sub(sub: &str, server: &ServerId) -> String {
    format!("_minecraft._tcp.{server}.{sub}")
}

/// Render the desired SRV target: `0 5 <port> <server>.<sub>.<domain>`.
pub fn srv_target(server: &ServerId, sub: &str, domain: &str, port: u16) -> String {
    format!("0 5 {port} {server}.{sub}.{domain}")
}

/// A resolved desired-state record, ready to diff against actual records.
#[derive(Debug, Clone)]
struct Expected {
    sub: String,
    record_type: RecordType,
    value: String,
}

const DEFAULT_TTL: u32 = 300;

fn expected_records(
    desired: &DesiredState,
    managed_sub: &str,
    domain: &str,
) -> Vec<Expected> {
    let mut out = Vec::new();
    for (name, address) in &desired.addresses {
        let sub = if name == "*" {
            wildcard_sub(managed_sub)
        } else {
            named_wildcard_sub(managed_sub, name)
        };
        out.push(Expected {
            sub,
            record_type: RecordType::A,
            value: address.host.clone(),
        });
    }
    for (server, port) in &desired.servers {
        out.push(Expected {
            sub: srv_sub(managed_sub, server),
            record_type: RecordType::Srv,
            value: srv_target(server, managed_sub, domain, *port),
        });
    }
    out
}

/// Compute the minimal set of record changes needed to make `actual`
/// match `desired`. `update` is only populated when the provider supports
/// a native update call; otherwise the same change is expressed as a
/// remove+add pair so every provider has a path to apply it.
pub fn compute_dns_diff(
    desired: &DesiredState,
    actual: &ActualState,
    managed_sub: &str,
    domain: &str,
    supports_native_update: bool,
) -> DnsDiff {
    let expected = expected_records(desired, managed_sub, domain);
    let mut remaining_actual: Vec<&DnsRecord> = actual.records.iter().collect();

    let mut add = Vec::new();
    let mut update = Vec::new();
    let mut remove = Vec::new();

    for exp in &expected {
        let candidate = DnsRecord {
            id: None,
            sub: exp.sub.clone(),
            record_type: exp.record_type,
            value: exp.value.clone(),
            ttl: DEFAULT_TTL,
        };

        if let Some(pos) = remaining_actual.iter().position(|r| r.same_as(&candidate)) {
            remaining_actual.remove(pos);
            continue;
        }

        // Same (sub, type) but different value/ttl: this is an update of
        // an existing record rather than an unrelated add+remove pair.
        if let Some(pos) = remaining_actual
            .iter()
            .position(|r| r.sub == exp.sub && r.record_type == exp.record_type)
        {
            let stale = remaining_actual.remove(pos);
            if supports_native_update {
                if let Some(id) = stale.id.clone() {
                    update.push(UpdateRecordEq {
                        id,
                        sub: exp.sub.clone(),
                        record_type: exp.record_type,
                        value: exp.value.clone(),
                        ttl: DEFAULT_TTL,
                    });
                    continue;
                }
            }
            if let Some(id) = stale.id.clone() {
                remove.push(id);
            }
        }

        add.push(NewRecordEq {
            sub: exp.sub.clone(),
            record_type: exp.record_type,
            value: exp.value.clone(),
            ttl: DEFAULT_TTL,
        });
    }

    remove.extend(remaining_actual.into_iter().filter_map(|r| r.id.clone()));

    DnsDiff { add, remove, update }
}

/// Build the desired L7 route table: one vhost per (server, address)
/// combination, naming scheme `<server>[.<addr_name>].<sub>.<domain>` ->
/// `<ip>:<host_port>`.
pub fn desired_routes(
    desired: &DesiredState,
    managed_sub: &str,
    domain: &str,
) -> HashMap<String, String> {
    let mut routes = HashMap::new();
    for (server, port) in &desired.servers {
        for (name, address) in &desired.addresses {
            let vhost = if name == "*" {
                format!("{server}.{managed_sub}.{domain}")
            } else {
                format!("{server}.{name}.{managed_sub}.{domain}")
            };
            routes.insert(vhost, format!("{}:{}", address.host, port));
        }
    }
    routes
}

/// Compute route changes: "add" for vhosts only in desired, "remove" for
/// vhosts only in actual, "update" for vhosts present in both with a
/// different backend.
pub fn compute_route_diff(
    desired_routes: &HashMap<String, String>,
    actual_routes: &HashMap<String, String>,
) -> RouteDiff {
    let mut diff = RouteDiff::default();
    for (vhost, backend) in desired_routes {
        match actual_routes.get(vhost) {
            None => {
                diff.add.insert(vhost.clone(), backend.clone());
            }
            Some(existing) if existing != backend => {
                diff.update.insert(vhost.clone(), backend.clone());
            }
            Some(_) => {}
        }
    }
    for vhost in actual_routes.keys() {
        if !desired_routes.contains_key(vhost) {
            diff.remove.push(vhost.clone());
        }
    }
    diff
}

/// Resolve one configured address source into a concrete host/port,
/// dropping (and letting the caller warn about) any that fail rather than
/// aborting the whole desired-state assembly.
pub fn resolve_address(
    source: &AddressSource,
    natmap: &HashMap<String, ResolvedAddress>,
) -> Option<ResolvedAddress> {
    match source {
        AddressSource::Manual { host, port } => Some(ResolvedAddress {
            host: host.clone(),
            port: *port,
        }),
        AddressSource::NatMap { internal_port } => {
            natmap.get(&format!("tcp:{internal_port}")).cloned()
        }
    }
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod tests;
