//! EventPayload trait - binds a Rust type to an (event type, schema version).
//!
//! # Trait bounds
//! - `DeserializeOwned`: decoded straight from the envelope body
//! - `Default`: missing fields fall back to zero values and are caught by
//!   `validate`, not by the decoder
//! - `Send + Sync + 'static`: stored behind `Arc` in the registry

use serde::de::DeserializeOwned;
use std::fmt::Debug;
use thiserror::Error;

use super::TypedEvent;

/// Business-rule violation found after a body decoded successfully.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{0} must be greater than 0")]
    NotPositive(&'static str),
}

pub trait EventPayload: DeserializeOwned + Default + Debug + Send + Sync + 'static {
    /// e.g. `user.created`
    const EVENT_TYPE: &'static str;

    /// e.g. `v1`
    const SCHEMA_VERSION: &'static str;

    fn validate(&self) -> Result<(), ValidationError>;

    fn into_event(self) -> TypedEvent;
}

pub(crate) fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

pub(crate) fn require_positive<N>(value: N, field: &'static str) -> Result<(), ValidationError>
where
    N: PartialOrd + Default,
{
    if value <= N::default() {
        return Err(ValidationError::NotPositive(field));
    }
    Ok(())
}
