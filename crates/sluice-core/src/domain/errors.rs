//! Error classification for message processing.
//!
//! Every processing failure is tagged explicitly as retriable or non-retriable.
//! The tag is the only thing the consumer looks at when choosing between
//! acknowledging a failed message and redelivering it with backoff.

use thiserror::Error;

use crate::ports::StoreError;
use crate::schema::SchemaError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Operational classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Redelivery may succeed (storage hiccup, unknown failure).
    Retriable,
    /// Redelivery cannot change the outcome (bad producer data, schema bug).
    NonRetriable,
}

/// What went wrong while processing one envelope.
#[derive(Debug, Error)]
pub enum FailureCause {
    #[error("failed to unmarshal message header: {0}")]
    MalformedHeader(#[source] serde_json::Error),

    #[error("invalid message header")]
    InvalidHeader,

    #[error("failed to unmarshal event body: {0}")]
    Schema(#[from] SchemaError),

    #[error("failed to save event to repository: {0}")]
    Storage(#[source] StoreError),

    #[error("failed to save failed event record: {source} (original error: {original})")]
    FailureRecordNotSaved {
        #[source]
        source: StoreError,
        original: Box<FailureCause>,
    },

    /// Failure raised by a handler other than the built-in processor.
    #[error("{0}")]
    Handler(#[source] BoxError),
}

/// A classified processing failure.
///
/// `From<FailureCause>` yields [`ProcessError::Retriable`]: a cause that nobody
/// classified is retried, and has to be opted into the non-retriable path.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Retriable(FailureCause),

    #[error(transparent)]
    NonRetriable(FailureCause),
}

impl ProcessError {
    pub fn retriable(cause: impl Into<FailureCause>) -> Self {
        Self::Retriable(cause.into())
    }

    pub fn non_retriable(cause: impl Into<FailureCause>) -> Self {
        Self::NonRetriable(cause.into())
    }

    /// Wrap an arbitrary handler error, left retriable.
    pub fn other(err: impl Into<BoxError>) -> Self {
        Self::Retriable(FailureCause::Handler(err.into()))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ProcessError::Retriable(_) => ErrorKind::Retriable,
            ProcessError::NonRetriable(_) => ErrorKind::NonRetriable,
        }
    }

    pub fn is_non_retriable(&self) -> bool {
        self.kind() == ErrorKind::NonRetriable
    }

    /// The underlying cause, whatever the classification.
    pub fn cause(&self) -> &FailureCause {
        match self {
            ProcessError::Retriable(cause) | ProcessError::NonRetriable(cause) => cause,
        }
    }

    pub fn into_cause(self) -> FailureCause {
        match self {
            ProcessError::Retriable(cause) | ProcessError::NonRetriable(cause) => cause,
        }
    }
}

impl From<FailureCause> for ProcessError {
    fn from(cause: FailureCause) -> Self {
        Self::Retriable(cause)
    }
}
