//! In-process port implementations for development and tests.
//!
//! - **InMemoryQueue**: visibility-timeout queue implementing `QueueTransport`
//! - **InMemoryRecordStore**: `RecordStore` keeping records in memory

pub mod inmem_queue;
pub mod inmem_store;

pub use self::inmem_queue::InMemoryQueue;
pub use self::inmem_store::InMemoryRecordStore;
