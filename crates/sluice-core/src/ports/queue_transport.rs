//! QueueTransport port - the queueing service as seen by the consumer.
//!
//! The production adapter (SQS-style HTTP calls, credentials, attribute
//! encoding) lives outside this crate. [`crate::impls::InMemoryQueue`] is the
//! in-process implementation used by tests and local runs.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::envelope::TransportMessage;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The service could not be reached or refused the call.
    #[error("queue transport unavailable: {0}")]
    Unavailable(String),

    /// The ack token is unknown or no longer valid for this delivery.
    #[error("invalid receipt handle: {0}")]
    InvalidReceipt(String),

    #[error("queue transport error: {0}")]
    Other(String),
}

/// Transport operations required by the consumer.
///
/// # Contract
/// - `receive` waits at most `wait_secs` and returns at most `max_messages`
///   messages; an empty vector is a normal result. Every returned message
///   carries the `ApproximateReceiveCount` attribute.
/// - `delete` removes the message identified by the ack token.
/// - `change_visibility` makes the message visible again after `delay_secs`;
///   0 means immediately.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    async fn receive(
        &self,
        max_messages: u32,
        wait_secs: u32,
    ) -> Result<Vec<TransportMessage>, TransportError>;

    async fn delete(&self, ack_token: &str) -> Result<(), TransportError>;

    async fn change_visibility(&self, ack_token: &str, delay_secs: u32)
    -> Result<(), TransportError>;
}
