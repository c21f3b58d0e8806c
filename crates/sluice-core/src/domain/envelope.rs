//! Envelope: one message as received from the queue.

use std::collections::HashMap;

/// Provider attribute carrying the approximate number of deliveries so far.
pub const RECEIVE_COUNT_ATTRIBUTE: &str = "ApproximateReceiveCount";

/// A message exactly as the transport hands it over.
///
/// Every field is optional on the wire; missing values become empty here so
/// that translation into an [`Envelope`] never fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportMessage {
    pub message_id: String,
    pub body: Vec<u8>,
    pub attributes: HashMap<String, String>,
    pub receipt_handle: String,
}

/// One unit of work received from the queue.
///
/// Immutable for the lifetime of one processing attempt: the consumer builds it,
/// hands a shared reference to the handler and uses its ack token afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    id: String,
    body: Vec<u8>,
    attributes: HashMap<String, String>,
    ack_token: String,
    receive_count: u32,
}

impl Envelope {
    /// Translate a transport-level message.
    ///
    /// The receive count is read from [`RECEIVE_COUNT_ATTRIBUTE`]; an absent or
    /// malformed value counts as 0.
    pub fn from_transport(message: TransportMessage) -> Self {
        let receive_count = message
            .attributes
            .get(RECEIVE_COUNT_ATTRIBUTE)
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .unwrap_or(0);

        Self {
            id: message.message_id,
            body: message.body,
            attributes: message.attributes,
            ack_token: message.receipt_handle,
            receive_count,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn ack_token(&self) -> &str {
        &self.ack_token
    }

    pub fn receive_count(&self) -> u32 {
        self.receive_count
    }
}
