// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic JSON/HTTP implementations of [`DnsProvider`] and [`L7Router`].
//!
//! Neither targets a specific vendor: both speak a small conventional
//! REST contract (list/add/remove/replace over JSON) that a thin
//! provider-specific gateway can sit in front of. An operator pointing
//! this at a real registrar or load balancer is expected to run such a
//! gateway; this client only needs a base URL and a bearer token.

use crate::model::{DnsRecord, NewRecord, UpdateRecord};
use crate::provider::{DnsProvider, ProviderError};
use crate::router::{L7Router, RouterError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A [`DnsProvider`] backed by a JSON REST API: `GET/POST/DELETE
/// <base_url>/records`.
pub struct HttpDnsProvider {
    client: Client,
    base_url: String,
    domain: String,
    bearer_token: Option<String>,
}

impl HttpDnsProvider {
    pub fn new(base_url: impl Into<String>, domain: impl Into<String>, bearer_token: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            domain: domain.into(),
            bearer_token,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let mut req = self.client.request(method, url);
        if let Some(token) = &self.bearer_token {
            req = req.bearer_auth(token);
        }
        req
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireRecord {
    id: Option<String>,
    sub: String,
    #[serde(rename = "type")]
    record_type: crate::model::RecordType,
    value: String,
    ttl: u32,
}

impl From<WireRecord> for DnsRecord {
    fn from(w: WireRecord) -> Self {
        Self {
            id: w.id,
            sub: w.sub,
            record_type: w.record_type,
            value: w.value,
            ttl: w.ttl,
        }
    }
}

impl From<&NewRecord> for WireRecord {
    fn from(r: &NewRecord) -> Self {
        Self {
            id: None,
            sub: r.sub.clone(),
            record_type: r.record_type,
            value: r.value.clone(),
            ttl: r.ttl,
        }
    }
}

impl From<&UpdateRecord> for WireRecord {
    fn from(r: &UpdateRecord) -> Self {
        Self {
            id: Some(r.id.clone()),
            sub: r.sub.clone(),
            record_type: r.record_type,
            value: r.value.clone(),
            ttl: r.ttl,
        }
    }
}

#[async_trait]
impl DnsProvider for HttpDnsProvider {
    fn domain(&self) -> &str {
        &self.domain
    }

    async fn list_records(&self) -> Result<Vec<DnsRecord>, ProviderError> {
        let resp = self
            .request(reqwest::Method::GET, "/records")
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;
        let records: Vec<WireRecord> = resp
            .error_for_status()
            .map_err(|e| ProviderError::Request(e.to_string()))?
            .json()
            .await
            .map_err(|e| ProviderError::UnexpectedResponse(e.to_string()))?;
        Ok(records.into_iter().map(Into::into).collect())
    }

    async fn add_records(&self, records: &[NewRecord]) -> Result<(), ProviderError> {
        let wire: Vec<WireRecord> = records.iter().map(Into::into).collect();
        self.request(reqwest::Method::POST, "/records")
            .json(&wire)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| ProviderError::Request(e.to_string()))?;
        Ok(())
    }

    async fn remove_records(&self, ids: &[String]) -> Result<(), ProviderError> {
        self.request(reqwest::Method::DELETE, "/records")
            .json(&ids)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| ProviderError::Request(e.to_string()))?;
        Ok(())
    }
}

/// An [`L7Router`] backed by a JSON REST API: `GET/PUT <base_url>/routes`.
pub struct HttpL7Router {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpL7Router {
    pub fn new(base_url: impl Into<String>, bearer_token: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            bearer_token,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let mut req = self.client.request(method, url);
        if let Some(token) = &self.bearer_token {
            req = req.bearer_auth(token);
        }
        req
    }
}

#[async_trait]
impl L7Router for HttpL7Router {
    async fn get_routes(&self) -> Result<HashMap<String, String>, RouterError> {
        let resp = self
            .request(reqwest::Method::GET, "/routes")
            .send()
            .await
            .map_err(|e| RouterError::Request(e.to_string()))?;
        resp.error_for_status()
            .map_err(|e| RouterError::Request(e.to_string()))?
            .json()
            .await
            .map_err(|e| RouterError::Request(e.to_string()))
    }

    async fn override_routes(&self, routes: HashMap<String, String>) -> Result<(), RouterError> {
        self.request(reqwest::Method::PUT, "/routes")
            .json(&routes)
            .send()
            .await
            .map_err(|e| RouterError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| RouterError::Request(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
