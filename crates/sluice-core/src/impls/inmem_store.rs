//! InMemoryRecordStore - development record store.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::record::{EVENTS_TABLE, OutcomeRecord};
use crate::ports::{RecordStore, StoreError};

/// Keeps saved records in memory, in save order.
///
/// ```ignore
/// let store = InMemoryRecordStore::new();
/// store.save(&record).await?;
/// assert_eq!(store.records().len(), 1);
/// ```
pub struct InMemoryRecordStore {
    table: String,
    records: Mutex<Vec<OutcomeRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::with_table(EVENTS_TABLE)
    }

    pub fn with_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn records(&self) -> Vec<OutcomeRecord> {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn save(&self, record: &OutcomeRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.push(record.clone());
        Ok(())
    }

    fn target(&self) -> &str {
        &self.table
    }
}
