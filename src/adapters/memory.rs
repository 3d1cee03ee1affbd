//! In-process record store for dry runs.

use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::domain::CallRecord;

use super::{CallHistory, RecordStore};

/// Keeps records in memory for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<CallRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record inserted so far, in insertion order
    pub fn records(&self) -> Vec<CallRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn insert_call_record(&self, record: &CallRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?
            .push(record.clone());
        Ok(())
    }
}

#[async_trait]
impl CallHistory for MemoryStore {
    async fn recent(&self, limit: usize) -> Result<Vec<CallRecord>> {
        let mut records = self.records();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }

    async fn find(&self, call_id: &str) -> Result<Option<CallRecord>> {
        Ok(self.records().into_iter().rev().find(|r| r.call_id == call_id))
    }
}
