use serde::{Deserialize, Serialize};

use crate::domain::header::null_as_default;
use super::TypedEvent;
use super::payload::{EventPayload, ValidationError, require};

/// `user.created` / `v1`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserCreatedV1 {
    #[serde(deserialize_with = "null_as_default")]
    pub user_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub role: String,
    #[serde(deserialize_with = "null_as_default")]
    pub verified: bool,
}

impl EventPayload for UserCreatedV1 {
    const EVENT_TYPE: &'static str = "user.created";
    const SCHEMA_VERSION: &'static str = "v1";

    fn validate(&self) -> Result<(), ValidationError> {
        require(&self.user_id, "user_id")?;
        require(&self.email, "email")?;
        require(&self.name, "name")?;
        require(&self.role, "role")
    }

    fn into_event(self) -> TypedEvent {
        TypedEvent::UserCreatedV1(self)
    }
}
