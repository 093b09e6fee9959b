// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parsing and validation of a per-server compose project file.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("invalid compose file: {reason}")]
    Invalid { reason: String },
    #[error("failed to read compose file: {0}")]
    Io(#[from] std::io::Error),
}

/// The subset of a `docker compose` project file this crate cares about:
/// enough to validate that a server's compose project defines exactly the
/// shape the driver expects (a single primary service with a game port).
#[derive(Debug, Clone, Deserialize)]
pub struct ComposeSpec {
    pub services: HashMap<String, ComposeService>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComposeService {
    pub image: Option<String>,
    #[serde(default)]
    pub ports: Vec<PortMapping>,
    #[serde(default)]
    pub environment: HashMap<String, String>,
}

/// A `host:container` or `host:container/proto` port mapping, in either the
/// short string form (`"25565:25565"`) or the long mapping form.
#[derive(Debug, Clone)]
pub struct PortMapping {
    pub host_port: u16,
    pub container_port: u16,
}

impl<'de> Deserialize<'de> for PortMapping {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Short(String),
            Long {
                published: PublishedPort,
                target: u16,
            },
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum PublishedPort {
            Num(u16),
            Str(String),
        }

        match Helper::deserialize(deserializer)? {
            Helper::Short(s) => parse_short_port(&s).map_err(serde::de::Error::custom),
            Helper::Long { published, target } => {
                let host_port = match published {
                    PublishedPort::Num(n) => n,
                    PublishedPort::Str(s) => s
                        .parse()
                        .map_err(|_| serde::de::Error::custom(format!("bad published port {s}")))?,
                };
                Ok(PortMapping {
                    host_port,
                    container_port: target,
                })
            }
        }
    }
}

fn parse_short_port(s: &str) -> Result<PortMapping, String> {
    let core = s.split('/').next().unwrap_or(s);
    let (host, container) = core
        .split_once(':')
        .ok_or_else(|| format!("port mapping missing ':': {s}"))?;
    let host_port: u16 = host
        .parse()
        .map_err(|_| format!("bad host port in {s}"))?;
    let container_port: u16 = container
        .parse()
        .map_err(|_| format!("bad container port in {s}"))?;
    Ok(PortMapping {
        host_port,
        container_port,
    })
}

impl ComposeSpec {
    pub fn parse(contents: &str) -> Result<Self, ComposeError> {
        serde_yaml::from_str(contents).map_err(|e| ComposeError::Invalid {
            reason: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, ComposeError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Validate the invariants the driver depends on: at least one service,
    /// and a single unambiguous primary service exposing the game port.
    pub fn validate(&self) -> Result<&ComposeService, ComposeError> {
        if self.services.is_empty() {
            return Err(ComposeError::Invalid {
                reason: "compose file defines no services".into(),
            });
        }
        if self.services.len() > 1 {
            return Err(ComposeError::Invalid {
                reason: format!(
                    "expected exactly one service, found {}: {:?}",
                    self.services.len(),
                    self.services.keys().collect::<Vec<_>>()
                ),
            });
        }
        let (_name, service) = self
            .services
            .iter()
            .next()
            .ok_or_else(|| ComposeError::Invalid {
                reason: "compose file defines no services".into(),
            })?;
        if service.ports.is_empty() {
            return Err(ComposeError::Invalid {
                reason: "primary service exposes no ports".into(),
            });
        }
        Ok(service)
    }

    /// The game-facing host port, if the primary service exposes one.
    pub fn game_host_port(&self) -> Option<u16> {
        self.services
            .values()
            .next()
            .and_then(|s| s.ports.first())
            .map(|p| p.host_port)
    }
}

#[cfg(test)]
#[path = "compose_tests.rs"]
mod tests;
