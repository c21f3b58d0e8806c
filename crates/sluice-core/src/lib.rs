//! sluice-core
//!
//! Core building blocks of an at-least-once queue consumer.
//!
//! - **domain**: envelopes, headers, outcome records, error classification,
//!   retry policy and decisions
//! - **schema**: versioned event payloads and the schema registry
//! - **ports**: queue transport, record store, clock, id generation
//! - **app**: message processor, queue consumer, builder
//! - **impls**: in-memory queue and record store
//! - **observability**: per-attempt traces and queue counts

pub mod app;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod schema;
