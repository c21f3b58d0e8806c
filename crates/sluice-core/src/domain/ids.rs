//! Strongly-typed identifiers.
//!
//! Identifiers generated by this crate are ULIDs wrapped in `Id<T>`, where `T`
//! is a zero-sized marker. The marker only exists at compile time, so two ids
//! with different markers cannot be mixed up while costing nothing at runtime.
//!
//! Message ids are *not* generated here: they come from the queueing service
//! and are kept as plain strings on the envelope.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// Marker trait that supplies the display prefix for an id type.
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// Generic ULID-backed identifier.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// Marker for outcome records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Record {}

impl IdMarker for Record {
    fn prefix() -> &'static str {
        "rec-"
    }
}

/// Identifier of one outcome record (one per processing attempt).
pub type RecordId = Id<Record>;
