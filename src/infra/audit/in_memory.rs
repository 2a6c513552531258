// In-memory audit store. Nothing survives a restart; used in tests and when
// no database path is configured.

use crate::core::audit::{AuditEntry, AuditError, AuditRecord, AuditStore};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct InMemoryAuditStore {
    // Sequence number -> record
    records: DashMap<u64, AuditRecord>,
    next_seq: AtomicU64,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, entry: AuditEntry) -> Result<AuditRecord, AuditError> {
        let record = AuditRecord::from_entry(entry, Utc::now());
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.records.insert(seq, record.clone());
        Ok(record)
    }

    async fn recent(&self, limit: u32) -> Result<Vec<AuditRecord>, AuditError> {
        let mut entries: Vec<(u64, AuditRecord)> = self
            .records
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();
        entries.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(entries
            .into_iter()
            .take(limit as usize)
            .map(|(_, record)| record)
            .collect())
    }
}
