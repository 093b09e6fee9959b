// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A clock that provides the current time
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;
    fn utc_now(&self) -> DateTime<Utc>;
    fn epoch_ms(&self) -> u64;
}

/// Real system clock
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn epoch_ms(&self) -> u64 {
        self.utc_now().timestamp_millis().max(0) as u64
    }
}

/// Fake clock for testing with controllable time
#[derive(Clone)]
pub struct FakeClock {
    instant: Arc<Mutex<Instant>>,
    utc: Arc<Mutex<DateTime<Utc>>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            instant: Arc::new(Mutex::new(Instant::now())),
            utc: Arc::new(Mutex::new(Utc::now())),
        }
    }

    /// Advance the clock by the given duration
    pub fn advance(&self, duration: Duration) {
        *self.instant.lock() += duration;
        *self.utc.lock() += chrono::Duration::from_std(duration).unwrap_or_default();
    }

    /// Set the clock to a specific UTC timestamp (and rebase the monotonic side to match).
    pub fn set_utc(&self, at: DateTime<Utc>) {
        *self.utc.lock() = at;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        *self.instant.lock()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        *self.utc.lock()
    }

    fn epoch_ms(&self) -> u64 {
        self.utc_now().timestamp_millis().max(0) as u64
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
