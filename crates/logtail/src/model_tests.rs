// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mc_core::Categorize;

#[test]
fn already_watching_is_conflict() {
    let err = WatchError::AlreadyWatching(ServerId::new("s1"));
    assert_eq!(err.category(), mc_core::ErrorCategory::Conflict);
}

#[test]
fn not_watching_is_not_found() {
    let err = WatchError::NotWatching(ServerId::new("s1"));
    assert_eq!(err.category(), mc_core::ErrorCategory::NotFound);
}
