//! Domain model (identifiers, envelopes, headers, records, errors, decisions).

pub mod decision;
pub mod envelope;
pub mod errors;
pub mod header;
pub mod ids;
pub mod record;
pub mod retry;

pub use decision::{Decider, Decision, DefaultDecider};
pub use envelope::{Envelope, RECEIVE_COUNT_ATTRIBUTE, TransportMessage};
pub use errors::{BoxError, ErrorKind, FailureCause, ProcessError};
pub use header::MessageHeader;
pub use ids::{Id, IdMarker, RecordId};
pub use record::{EVENTS_TABLE, OutcomeRecord, RecordStatus};
pub use retry::RetryPolicy;
