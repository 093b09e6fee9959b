// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DNS provider capability set: a narrow adapter trait generalized to an
//! external DNS API instead of a local process.

use crate::model::{DnsRecord, NewRecord, UpdateRecord};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("dns provider request failed: {0}")]
    Request(String),
    #[error("dns provider returned an unexpected response: {0}")]
    UnexpectedResponse(String),
}

#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// The apex domain this provider manages records under.
    fn domain(&self) -> &str;

    async fn list_records(&self) -> Result<Vec<DnsRecord>, ProviderError>;

    async fn add_records(&self, records: &[NewRecord]) -> Result<(), ProviderError>;

    async fn remove_records(&self, ids: &[String]) -> Result<(), ProviderError>;

    /// Default implementation for providers with no native update call:
    /// remove the old record, then add its replacement. Providers with a
    /// genuine in-place update should override this.
    async fn update_records(&self, updates: &[UpdateRecord]) -> Result<(), ProviderError> {
        let ids: Vec<String> = updates.iter().map(|u| u.id.clone()).collect();
        self.remove_records(&ids).await?;
        let news: Vec<NewRecord> = updates
            .iter()
            .map(|u| NewRecord {
                sub: u.sub.clone(),
                record_type: u.record_type,
                value: u.value.clone(),
                ttl: u.ttl,
            })
            .collect();
        self.add_records(&news).await
    }

    /// Whether this provider implements `update_records` natively (an
    /// atomic rename) rather than via the default remove+add fallback.
    fn supports_native_update(&self) -> bool {
        false
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
