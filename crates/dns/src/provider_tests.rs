// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::model::RecordType;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct FakeProvider {
    records: Arc<Mutex<Vec<DnsRecord>>>,
    removed: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl DnsProvider for FakeProvider {
    fn domain(&self) -> &str {
        "example.com"
    }

    async fn list_records(&self) -> Result<Vec<DnsRecord>, ProviderError> {
        Ok(self.records.lock().clone())
    }

    async fn add_records(&self, records: &[NewRecord]) -> Result<(), ProviderError> {
        let mut guard = self.records.lock();
        for r in records {
            guard.push(DnsRecord {
                id: Some(format!("id-{}", guard.len())),
                sub: r.sub.clone(),
                record_type: r.record_type,
                value: r.value.clone(),
                ttl: r.ttl,
            });
        }
        Ok(())
    }

    async fn remove_records(&self, ids: &[String]) -> Result<(), ProviderError> {
        self.removed.lock().extend(ids.iter().cloned());
        self.records
            .lock()
            .retain(|r| !ids.iter().any(|id| Some(id.as_str()) == r.id.as_deref()));
        Ok(())
    }
}

#[tokio::test]
async fn default_update_removes_then_adds() {
    let provider = FakeProvider::default();
    provider
        .add_records(&[NewRecord {
            sub: "vanilla".into(),
            record_type: RecordType::A,
            value: "1.1.1.1".into(),
            ttl: 300,
        }])
        .await
        .unwrap();

    let existing_id = provider.list_records().await.unwrap()[0].id.clone().unwrap();
    provider
        .update_records(&[UpdateRecord {
            id: existing_id.clone(),
            sub: "vanilla".into(),
            record_type: RecordType::A,
            value: "2.2.2.2".into(),
            ttl: 300,
        }])
        .await
        .unwrap();

    assert!(provider.removed.lock().contains(&existing_id));
    let records = provider.list_records().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].value, "2.2.2.2");
    assert!(!provider.supports_native_update());
}
