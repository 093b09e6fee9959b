// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! L7 router capability set: a vhost -> backend map that the reconciler
//! can read and wholesale replace.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("l7 router request failed: {0}")]
    Request(String),
}

#[async_trait]
pub trait L7Router: Send + Sync {
    async fn get_routes(&self) -> Result<HashMap<String, String>, RouterError>;

    /// Replace the entire route table. Semantically `remove_all` then
    /// `add_routes(new)`; the router is responsible for atomicity.
    async fn override_routes(&self, routes: HashMap<String, String>) -> Result<(), RouterError>;
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
