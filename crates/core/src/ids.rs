// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifiers shared across the fleet control plane.

crate::define_id! {
    /// Identifies a single Minecraft server instance (and its compose project).
    pub struct ServerId;
}

crate::define_id! {
    /// Identifies a submitted background task.
    #[derive(Default)]
    pub struct TaskId;
}

crate::define_id! {
    /// Identifies a registered cron job definition.
    pub struct CronJobId;
}

crate::define_id! {
    /// Identifies a single firing (execution) of a cron job.
    #[derive(Default)]
    pub struct ExecutionId;
}

#[cfg(test)]
#[path = "ids_tests.rs"]
mod tests;
