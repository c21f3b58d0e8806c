use serde::{Deserialize, Serialize};

use crate::domain::header::null_as_default;
use super::TypedEvent;
use super::payload::{EventPayload, ValidationError, require, require_positive};

/// `order.placed` / `v1`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderPlacedV1 {
    #[serde(deserialize_with = "null_as_default")]
    pub order_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub user_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub total: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub items_count: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
}

impl EventPayload for OrderPlacedV1 {
    const EVENT_TYPE: &'static str = "order.placed";
    const SCHEMA_VERSION: &'static str = "v1";

    fn validate(&self) -> Result<(), ValidationError> {
        require(&self.order_id, "order_id")?;
        require(&self.user_id, "user_id")?;
        require_positive(self.total, "total")?;
        require_positive(self.items_count, "items_count")?;
        require(&self.status, "status")
    }

    fn into_event(self) -> TypedEvent {
        TypedEvent::OrderPlacedV1(self)
    }
}
