// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Archive filename sanitization and generation.

use chrono::{DateTime, Utc};

const UNSAFE_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|', ' '];

/// Replace any unsafe filename character with `_`, trim leading/trailing
/// underscores left over from a leading/trailing separator, and fall back
/// to `"unknown"` if nothing usable remains (empty, or all dots).
pub fn sanitize_filename_part(part: &str) -> String {
    let replaced: String = part
        .chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let trimmed = replaced.trim_matches('_');
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        "unknown".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `<safe(server)>[_<safe(path)>]_<timestamp>.7z`. A root or absent path
/// contributes no path segment.
pub fn generate_archive_filename(server: &str, path: Option<&str>, now: DateTime<Utc>) -> String {
    let server_safe = sanitize_filename_part(server);
    let timestamp = now.format("%Y%m%d_%H%M%S");
    match path.filter(|p| !p.is_empty() && *p != "/") {
        Some(p) => format!("{server_safe}_{}_{timestamp}.7z", sanitize_filename_part(p)),
        None => format!("{server_safe}_{timestamp}.7z"),
    }
}

#[cfg(test)]
#[path = "filename_tests.rs"]
mod tests;
