//! Versioned event schemas.
//!
//! - **payload**: `EventPayload` trait and validation errors
//! - **registry**: `SchemaRegistry`, the (type, version) lookup table
//! - one module per built-in payload type

pub mod order_placed;
pub mod payload;
pub mod payment_processed;
pub mod registry;
pub mod user_created;

pub use order_placed::OrderPlacedV1;
pub use payload::{EventPayload, ValidationError};
pub use payment_processed::PaymentProcessedV1;
pub use registry::{SchemaError, SchemaRegistry};
pub use user_created::UserCreatedV1;

/// Closed set of payload variants the registry can produce.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedEvent {
    UserCreatedV1(UserCreatedV1),
    OrderPlacedV1(OrderPlacedV1),
    PaymentProcessedV1(PaymentProcessedV1),
}

impl TypedEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            TypedEvent::UserCreatedV1(_) => UserCreatedV1::EVENT_TYPE,
            TypedEvent::OrderPlacedV1(_) => OrderPlacedV1::EVENT_TYPE,
            TypedEvent::PaymentProcessedV1(_) => PaymentProcessedV1::EVENT_TYPE,
        }
    }

    pub fn schema_version(&self) -> &'static str {
        match self {
            TypedEvent::UserCreatedV1(_) => UserCreatedV1::SCHEMA_VERSION,
            TypedEvent::OrderPlacedV1(_) => OrderPlacedV1::SCHEMA_VERSION,
            TypedEvent::PaymentProcessedV1(_) => PaymentProcessedV1::SCHEMA_VERSION,
        }
    }
}
