// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Closed registry of cron job handlers. A job's [`crate::model::CronJobKind`]
//! must have a handler registered here or the scheduler refuses to fire it —
//! there is no dynamic/open-ended handler lookup.

use crate::model::CronJob;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// What a firing hands its handler: the job's parameters (mirrored off
/// [`CronJob::kind`] so a handler doesn't have to match on the kind itself
/// to get at them) and a line-oriented log sink recorded on the
/// [`crate::model::CronExecution`] row.
pub struct CronExecutionContext {
    pub params: serde_json::Value,
    messages: Mutex<Vec<String>>,
}

impl CronExecutionContext {
    pub fn new(params: serde_json::Value) -> Self {
        Self {
            params,
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Record a line of handler-emitted output against this firing.
    pub fn log(&self, line: impl Into<String>) {
        self.messages.lock().push(line.into());
    }

    pub fn into_messages(self) -> Vec<String> {
        self.messages.into_inner()
    }
}

#[async_trait]
pub trait CronHandler: Send + Sync {
    /// Run the job, returning human-readable output on success or an error
    /// message on failure. Handlers own their own timeout/cancellation
    /// policy; the scheduler only records what they return. `ctx` exposes
    /// the job's parameters and a sink for structured progress lines.
    async fn run(&self, job: &CronJob, ctx: &CronExecutionContext) -> Result<String, String>;
}

#[derive(Clone, Default)]
pub struct CronRegistry {
    handlers: HashMap<&'static str, Arc<dyn CronHandler>>,
}

impl CronRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: &'static str, handler: Arc<dyn CronHandler>) {
        self.handlers.insert(kind, handler);
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn CronHandler>> {
        self.handlers.get(kind).cloned()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
