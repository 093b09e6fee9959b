// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn passthrough_wraps_non_empty_line() {
    let parsed = PassthroughParser.parse("hello world").unwrap();
    assert_eq!(parsed, serde_json::json!({ "line": "hello world" }));
}

#[test]
fn passthrough_ignores_empty_line() {
    assert!(PassthroughParser.parse("").is_none());
}
