//! Message header: the JSON document carried in an envelope body.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;

/// Decode JSON `null` as the type's zero value, like an absent field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Header fields shared by every event, plus the opaque typed body.
///
/// Missing or `null` scalar fields decode as empty strings and a missing body
/// decodes as `None`; [`MessageHeader::is_valid`] is what rejects them. Only structurally
/// broken JSON (or a field of the wrong JSON type) fails decoding.
///
/// `body` is kept as raw JSON so the persisted record carries the producer's
/// bytes unchanged.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageHeader {
    #[serde(deserialize_with = "null_as_default")]
    pub event_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub event_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tenant_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub client_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub schema_version: String,
    #[serde(deserialize_with = "null_as_default")]
    pub occurred_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Box<RawValue>>,
}

impl MessageHeader {
    pub fn from_slice(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }

    /// Raw body text, empty when the body is absent.
    pub fn body_text(&self) -> &str {
        self.body.as_deref().map(RawValue::get).unwrap_or_default()
    }

    /// All six scalar fields are non-empty and the body is present.
    pub fn is_valid(&self) -> bool {
        !self.event_id.is_empty()
            && !self.event_type.is_empty()
            && !self.tenant_id.is_empty()
            && !self.client_id.is_empty()
            && !self.schema_version.is_empty()
            && !self.occurred_at.is_empty()
            && !self.body_text().is_empty()
    }
}
