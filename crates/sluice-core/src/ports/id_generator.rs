//! IdGenerator port - record id generation.
//!
//! Record ids are ULIDs: sortable by creation time and safe to generate on
//! any number of workers without coordination.

use ulid::Ulid;

use crate::domain::ids::RecordId;
use crate::ports::Clock;

pub trait IdGenerator: Send + Sync {
    fn generate_record_id(&self) -> RecordId;
}

/// ULID generator whose timestamp part comes from a [`Clock`].
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_record_id(&self) -> RecordId {
        let timestamp_ms = u64::try_from(self.clock.now().timestamp_millis()).unwrap_or(0);
        RecordId::from(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}
