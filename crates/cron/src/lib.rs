// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron scheduling: a closed registry of job kinds, a restart-slot finder
//! that keeps restart and backup jobs from colliding, and a manager that
//! persists jobs/executions and drives a tick-based scheduler loop.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod manager;
pub mod model;
pub mod registry;
pub mod restart_slot;

pub use manager::{next_run_after, CronError, CronManager};
pub use model::{CronExecution, CronJob, CronJobKind, CronJobStatus, ExecutionStatus};
pub use registry::{CronExecutionContext, CronHandler, CronRegistry};
pub use restart_slot::{
    check_time_conflict, find_next_available_restart_time, generate_restart_cron,
    get_backup_minutes, get_restart_time_slots, parse_cron_field, RestartSlotInput, SlotKind,
};
