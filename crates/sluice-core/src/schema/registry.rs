//! SchemaRegistry - (event type, schema version) → typed payload.
//!
//! Payload types are registered generically and stored type-erased behind
//! `Arc<dyn DynSchema>`, in a two-level table keyed by event type, then by
//! schema version.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use thiserror::Error;

use super::TypedEvent;
use super::order_placed::OrderPlacedV1;
use super::payload::{EventPayload, ValidationError};
use super::payment_processed::PaymentProcessedV1;
use super::user_created::UserCreatedV1;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    #[error("unknown schema version {version} for event type {event_type}")]
    UnknownSchemaVersion { event_type: String, version: String },

    #[error("invalid JSON body: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("schema validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Object-safe face of a registered payload type.
trait DynSchema: Send + Sync {
    fn unmarshal(&self, raw: &[u8]) -> Result<TypedEvent, SchemaError>;
}

struct TypedSchema<T: EventPayload> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: EventPayload> TypedSchema<T> {
    fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T: EventPayload> DynSchema for TypedSchema<T> {
    fn unmarshal(&self, raw: &[u8]) -> Result<TypedEvent, SchemaError> {
        let payload: T = serde_json::from_slice(raw).map_err(SchemaError::Decode)?;
        payload.validate()?;
        Ok(payload.into_event())
    }
}

/// Registry of known payload schemas.
///
/// Read-only once the consumer starts, so it can be shared behind an `Arc`
/// without locking.
///
/// ```ignore
/// let mut registry = SchemaRegistry::new();
/// registry.register::<UserCreatedV1>();
///
/// let event = registry.unmarshal("user.created", "v1", body)?;
/// ```
#[derive(Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, HashMap<String, Arc<dyn DynSchema>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in schema installed.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register::<UserCreatedV1>()
            .register::<OrderPlacedV1>()
            .register::<PaymentProcessedV1>();
        registry
    }

    /// Install `T` under its own event type and schema version.
    pub fn register<T: EventPayload>(&mut self) -> &mut Self {
        self.register_as::<T>(T::EVENT_TYPE, T::SCHEMA_VERSION)
    }

    /// Install `T` under an arbitrary pair. A later registration replaces an
    /// earlier one for the same pair.
    pub fn register_as<T: EventPayload>(
        &mut self,
        event_type: impl Into<String>,
        version: impl Into<String>,
    ) -> &mut Self {
        self.schemas
            .entry(event_type.into())
            .or_default()
            .insert(version.into(), Arc::new(TypedSchema::<T>::new()));
        self
    }

    pub fn contains(&self, event_type: &str, version: &str) -> bool {
        self.schemas
            .get(event_type)
            .is_some_and(|versions| versions.contains_key(version))
    }

    /// Decode and validate `raw` as the payload registered for the pair.
    pub fn unmarshal(
        &self,
        event_type: &str,
        version: &str,
        raw: &[u8],
    ) -> Result<TypedEvent, SchemaError> {
        let versions = self
            .schemas
            .get(event_type)
            .ok_or_else(|| SchemaError::UnknownEventType(event_type.to_string()))?;

        let schema = versions
            .get(version)
            .ok_or_else(|| SchemaError::UnknownSchemaVersion {
                event_type: event_type.to_string(),
                version: version.to_string(),
            })?;

        schema.unmarshal(raw)
    }

    /// Registered pairs as `type/version`, sorted.
    pub fn registered_schemas(&self) -> Vec<String> {
        let mut pairs: Vec<String> = self
            .schemas
            .iter()
            .flat_map(|(event_type, versions)| {
                versions
                    .keys()
                    .map(move |version| format!("{event_type}/{version}"))
            })
            .collect();
        pairs.sort();
        pairs
    }
}
