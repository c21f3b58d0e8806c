use serde::{Deserialize, Serialize};

use crate::domain::header::null_as_default;
use super::TypedEvent;
use super::payload::{EventPayload, ValidationError, require, require_positive};

/// `payment.processed` / `v1`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentProcessedV1 {
    #[serde(deserialize_with = "null_as_default")]
    pub payment_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub order_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub amount: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub payment_method: String,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
}

impl EventPayload for PaymentProcessedV1 {
    const EVENT_TYPE: &'static str = "payment.processed";
    const SCHEMA_VERSION: &'static str = "v1";

    fn validate(&self) -> Result<(), ValidationError> {
        require(&self.payment_id, "payment_id")?;
        require(&self.order_id, "order_id")?;
        require_positive(self.amount, "amount")?;
        require(&self.payment_method, "payment_method")?;
        require(&self.status, "status")
    }

    fn into_event(self) -> TypedEvent {
        TypedEvent::PaymentProcessedV1(self)
    }
}
