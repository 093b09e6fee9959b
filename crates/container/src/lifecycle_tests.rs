// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    removed           = { RawContainerState::Removed, None, LifecycleStatus::Removed },
    exists            = { RawContainerState::Exists, None, LifecycleStatus::Exists },
    created           = { RawContainerState::Created, None, LifecycleStatus::Created },
    running_healthy   = { RawContainerState::Running, Some(true), LifecycleStatus::Healthy },
    running_starting  = { RawContainerState::Running, Some(false), LifecycleStatus::Starting },
    running_no_probe  = { RawContainerState::Running, None, LifecycleStatus::Running },
)]
fn derives_expected_status(raw: RawContainerState, probe: Option<bool>, expected: LifecycleStatus) {
    assert_eq!(LifecycleStatus::derive(raw, probe), expected);
}
