//! RecordStore port - durable sink for outcome records.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::record::{EVENTS_TABLE, OutcomeRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    #[error("record rejected: {0}")]
    Rejected(String),
}

/// Persists one [`OutcomeRecord`] per processing attempt.
///
/// Saves are independent puts keyed by the record id; there is no
/// transaction and no read path.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn save(&self, record: &OutcomeRecord) -> Result<(), StoreError>;

    /// Logical table the records land in.
    fn target(&self) -> &str {
        EVENTS_TABLE
    }
}
