// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Restart-slot finder: picks a `minute hour * * *` restart time for a
//! server that doesn't collide with any server's backup minute or any
//! other server's restart slot.
//!
//! The conflict rules (and the exact rounding/rollover behavior) are more
//! precise than "avoid conflicts" alone would pin down. In particular:
//! - backup-minute conflicts are global (any hour, any server);
//! - restart-slot conflicts are scoped to a specific `(hour, minute)` pair;
//! - paused jobs still occupy a slot — only cancelled jobs free one up;
//! - the search starts on the current 5-minute grid line, rounding the
//!   given start time down;
//! - if every slot in the current hour is taken the search rolls into
//!   later hours (wrapping at midnight), and if literally every slot in a
//!   full day is taken, the search gives up and returns the original,
//!   unrounded start time rather than looping forever.

use chrono::{DateTime, Timelike, Utc};
use mc_core::ServerId;
use std::collections::HashSet;

/// What kind of scheduled job a [`RestartSlotInput`] describes, for the
/// purpose of conflict detection. Only restart and backup jobs occupy
/// slots; everything else is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    RestartServer,
    BackupServer,
    Other,
}

/// The minimal view of a cron job the slot finder needs: its kind and its
/// minute/hour cron fields. Cancelled jobs are excluded by the caller
/// before calling into this module; paused jobs are passed in as `active`.
#[derive(Debug, Clone)]
pub struct RestartSlotInput<'a> {
    pub kind: SlotKind,
    pub minute_field: &'a str,
    pub hour_field: &'a str,
    /// The server this entry belongs to, if any. Lets a caller re-slot a
    /// server's own existing `RestartServer` entry via `exclude_server_id`
    /// without it conflicting with itself.
    pub server_id: Option<&'a ServerId>,
}

/// Parse a single cron minute/hour field into the set of values it selects.
/// Supports: `*`, a single value, a comma list, a range (`a-b`), a step
/// (`*/n` or `a-b/n`), and arbitrary comma-joined mixes of the above.
pub fn parse_cron_field(field: &str, max: u32) -> Vec<u32> {
    let mut values = HashSet::new();
    for part in field.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if let Some((range_part, step_part)) = part.split_once('/') {
            let step: u32 = step_part.parse().unwrap_or(1).max(1);
            let (lo, hi) = if range_part == "*" {
                (0, max)
            } else if let Some((a, b)) = range_part.split_once('-') {
                (a.parse().unwrap_or(0), b.parse().unwrap_or(max))
            } else {
                (range_part.parse().unwrap_or(0), max)
            };
            let mut v = lo;
            while v <= hi {
                values.insert(v);
                v += step;
            }
        } else if part == "*" {
            for v in 0..=max {
                values.insert(v);
            }
        } else if let Some((a, b)) = part.split_once('-') {
            let lo: u32 = a.parse().unwrap_or(0);
            let hi: u32 = b.parse().unwrap_or(max);
            for v in lo..=hi {
                values.insert(v);
            }
        } else if let Ok(v) = part.parse::<u32>() {
            values.insert(v);
        }
    }
    let mut values: Vec<u32> = values.into_iter().filter(|v| *v <= max).collect();
    values.sort_unstable();
    values
}

/// Every minute occupied by a backup job, across all hours. Backup
/// conflicts are global: a restart at `12:05` conflicts with a backup
/// scheduled `* 5` just as much as one scheduled `12 5`.
pub fn get_backup_minutes(jobs: &[RestartSlotInput<'_>]) -> HashSet<u32> {
    let mut minutes = HashSet::new();
    for job in jobs {
        if job.kind == SlotKind::BackupServer {
            minutes.extend(parse_cron_field(job.minute_field, 59));
        }
    }
    minutes
}

/// Every `(hour, minute)` pair occupied by a restart job, excluding the
/// given server's own `RestartServer` entries when `exclude_server_id` is
/// set — so re-slotting a server's restart job doesn't conflict with the
/// slot it currently occupies. Backup-minute conflicts are never excluded
/// this way; see [`get_backup_minutes`].
pub fn get_restart_time_slots(
    jobs: &[RestartSlotInput<'_>],
    exclude_server_id: Option<&ServerId>,
) -> HashSet<(u32, u32)> {
    let mut slots = HashSet::new();
    for job in jobs {
        if job.kind != SlotKind::RestartServer {
            continue;
        }
        if let Some(exclude) = exclude_server_id {
            if job.server_id == Some(exclude) {
                continue;
            }
        }
        let hours = parse_cron_field(job.hour_field, 23);
        let minutes = parse_cron_field(job.minute_field, 59);
        for h in &hours {
            for m in &minutes {
                slots.insert((*h, *m));
            }
        }
    }
    slots
}

/// Round a timestamp down to the nearest 5-minute grid line, zeroing
/// seconds and sub-second precision.
fn round_down_to_five_minutes(at: DateTime<Utc>) -> DateTime<Utc> {
    let rounded_minute = (at.minute() / 5) * 5;
    at.with_minute(rounded_minute)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

/// Find the next `(hour, minute)` restart slot starting from `start` that
/// doesn't collide with any backup minute or any other restart slot
/// (jobs for `exclude_server` — if provided by the caller via a
/// pre-filtered `jobs` slice — are not double-counted against themselves).
///
/// Falls back to the unrounded `start` time if every slot is occupied.
pub fn find_next_available_restart_time(
    jobs: &[RestartSlotInput<'_>],
    start: DateTime<Utc>,
    exclude_server_id: Option<&ServerId>,
) -> DateTime<Utc> {
    let backup_minutes = get_backup_minutes(jobs);
    let restart_slots = get_restart_time_slots(jobs, exclude_server_id);
    let rounded = round_down_to_five_minutes(start);

    let candidate_minutes: Vec<u32> = (0..60).step_by(5).collect();

    // Search the starting hour first, beginning at the rounded minute.
    let start_hour = rounded.hour();
    for &minute in &candidate_minutes {
        if minute < rounded.minute() {
            continue;
        }
        if !backup_minutes.contains(&minute) && !restart_slots.contains(&(start_hour, minute)) {
            return rounded
                .with_minute(minute)
                .unwrap_or(rounded);
        }
    }

    // Roll forward through the remaining hours of the day.
    for offset in 1..24u32 {
        let hour = (start_hour + offset) % 24;
        for &minute in &candidate_minutes {
            if !backup_minutes.contains(&minute) && !restart_slots.contains(&(hour, minute)) {
                let mut candidate = rounded.with_hour(hour).unwrap_or(rounded);
                candidate = candidate.with_minute(minute).unwrap_or(candidate);
                if hour < start_hour {
                    candidate += chrono::Duration::days(1);
                }
                return candidate;
            }
        }
    }

    // Every slot in the day is occupied: give up and keep the configured
    // start time rather than looping forever.
    start
}

/// Render a restart time as a `minute hour * * *` cron expression.
pub fn generate_restart_cron(at: DateTime<Utc>) -> String {
    format!("{} {} * * *", at.minute(), at.hour())
}

/// Whether `at` collides with any existing backup minute or restart slot.
pub fn check_time_conflict(
    jobs: &[RestartSlotInput<'_>],
    at: DateTime<Utc>,
    exclude_server_id: Option<&ServerId>,
) -> bool {
    let backup_minutes = get_backup_minutes(jobs);
    let restart_slots = get_restart_time_slots(jobs, exclude_server_id);
    backup_minutes.contains(&at.minute()) || restart_slots.contains(&(at.hour(), at.minute()))
}

#[cfg(test)]
#[path = "restart_slot_tests.rs"]
mod tests;
