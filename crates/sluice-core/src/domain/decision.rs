//! Decision model: what to do with a message once its attempt is over.
//!
//! This module defines the Decision type (queue disposition) and the Decider
//! trait (how to pick one from the attempt result).

use std::time::Duration;

use super::errors::ProcessError;
use super::retry::RetryPolicy;

/// Disposition of a message after one processing attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Remove the message from the queue (success, or a permanent failure).
    Ack,

    /// Make the message visible again after `delay`.
    Retry { delay: Duration },

    /// Make the message visible again immediately so the queue's redrive
    /// policy can move it aside.
    Redrive,
}

impl Decision {
    /// Visibility delay to request from the transport, if any.
    pub fn delay_secs(&self) -> Option<i32> {
        match self {
            Decision::Ack => None,
            Decision::Retry { delay } => Some(i32::try_from(delay.as_secs()).unwrap_or(i32::MAX)),
            Decision::Redrive => Some(0),
        }
    }
}

/// Picks a [`Decision`] for one attempt.
///
/// Deciders are pure: they only look at the receive count and the result.
pub trait Decider: Send + Sync {
    fn decide(&self, receive_count: u32, result: &Result<(), ProcessError>) -> Decision;
}

/// Default decider:
/// - success and non-retriable failures are acknowledged
/// - retriable failures past `max_retries` are redriven
/// - every other retriable failure is retried with exponential backoff
#[derive(Debug, Clone, Default)]
pub struct DefaultDecider {
    retry_policy: RetryPolicy,
}

impl DefaultDecider {
    pub fn new(retry_policy: RetryPolicy) -> Self {
        Self { retry_policy }
    }
}

impl Decider for DefaultDecider {
    fn decide(&self, receive_count: u32, result: &Result<(), ProcessError>) -> Decision {
        match result {
            Ok(()) => Decision::Ack,
            Err(err) if err.is_non_retriable() => Decision::Ack,
            Err(_) if self.retry_policy.is_exhausted(receive_count) => Decision::Redrive,
            Err(_) => Decision::Retry {
                delay: self.retry_policy.next_delay(receive_count),
            },
        }
    }
}
