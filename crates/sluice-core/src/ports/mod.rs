//! Ports - boundaries to the outside world.
//!
//! Each trait stands for an external system (queueing service, record store)
//! or an ambient source of non-determinism (time, ids), so the processing core
//! can run against in-memory implementations in tests.

pub mod clock;
pub mod id_generator;
pub mod queue_transport;
pub mod record_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::queue_transport::{QueueTransport, TransportError};
pub use self::record_store::{RecordStore, StoreError};

#[cfg(test)]
pub use self::record_store::MockRecordStore;
