// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pluggable per-line parsing, invoked synchronously from the tailing loop
//! for every complete line read from a server's log file.

/// Parses a single log line into a structured value, or `None` if the line
/// carries no event the bus cares about.
pub trait LineParser: Send + Sync {
    fn parse(&self, line: &str) -> Option<serde_json::Value>;
}

/// Forwards every non-empty line verbatim as `{"line": "..."}`. Used when no
/// server-specific grammar is registered.
pub struct PassthroughParser;

impl LineParser for PassthroughParser {
    fn parse(&self, line: &str) -> Option<serde_json::Value> {
        if line.is_empty() {
            None
        } else {
            Some(serde_json::json!({ "line": line }))
        }
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
