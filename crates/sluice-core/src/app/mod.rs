//! Application layer: wires ports into the consume → process → settle loop.
//!
//! - **handler**: `MessageHandler` trait and per-attempt `MessageContext`
//! - **processor**: `MessageProcessor`, the built-in handler
//! - **consumer**: `QueueConsumer`, receive/ack/nack and the batch loop
//! - **builder**: `AppBuilder`, wiring with startup validation

pub mod builder;
pub mod consumer;
pub mod handler;
pub mod processor;

pub use self::builder::{App, AppBuilder, BuildError};
pub use self::consumer::{ConsumerError, ConsumerOptions, QueueConsumer};
pub use self::handler::{MessageContext, MessageHandler};
pub use self::processor::MessageProcessor;
