// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

struct AlwaysOk;

#[async_trait]
impl CronHandler for AlwaysOk {
    async fn run(&self, _job: &CronJob, _ctx: &CronExecutionContext) -> Result<String, String> {
        Ok("done".into())
    }
}

#[test]
fn unregistered_kind_is_not_found() {
    let registry = CronRegistry::new();
    assert!(registry.get("restart_server").is_none());
    assert!(!registry.contains("restart_server"));
}

#[test]
fn registered_kind_is_retrievable() {
    let mut registry = CronRegistry::new();
    registry.register("restart_server", std::sync::Arc::new(AlwaysOk));
    assert!(registry.contains("restart_server"));
    assert!(registry.get("restart_server").is_some());
}

#[test]
fn execution_context_records_log_lines_in_order() {
    let ctx = CronExecutionContext::new(serde_json::json!({"server_id": "s1"}));
    ctx.log("starting");
    ctx.log("done");
    assert_eq!(ctx.into_messages(), vec!["starting".to_string(), "done".to_string()]);
}
