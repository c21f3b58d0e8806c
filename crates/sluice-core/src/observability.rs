//! Per-attempt trace recording and queue status views.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::domain::errors::ProcessError;

/// Separator between trace lines in the flushed log entry.
pub const TRACE_SEPARATOR: &str = " | ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceLevel {
    Info,
    Error,
}

/// The single log entry produced by a flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceLine {
    pub level: TraceLevel,
    pub text: String,
}

#[derive(Debug, Default)]
struct TraceState {
    lines: Vec<String>,
    flushed: bool,
}

/// Ordered log lines for one processing attempt.
///
/// Lines are collected during the attempt and written out as one structured
/// `tracing` event, so the log for a message is never interleaved with other
/// workers' output. Appends from several tasks are serialized by the mutex.
#[derive(Debug)]
pub struct Trace {
    message_id: String,
    state: Mutex<TraceState>,
}

impl Trace {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            state: Mutex::new(TraceState::default()),
        }
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn append(&self, line: impl Into<String>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.lines.push(line.into());
    }

    pub fn lines(&self) -> Vec<String> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.lines.clone()
    }

    /// Emit the collected lines as one log entry.
    ///
    /// ERROR level when `error` is given, INFO otherwise. Only the first call
    /// emits anything; later calls return `None`.
    pub fn flush(&self, error: Option<&ProcessError>) -> Option<TraceLine> {
        let text = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.flushed {
                return None;
            }
            state.flushed = true;
            state.lines.join(TRACE_SEPARATOR)
        };

        let level = match error {
            Some(err) => {
                tracing::error!(
                    message_id = %self.message_id,
                    trace = %text,
                    error = %err,
                    kind = ?err.kind(),
                    "message trace"
                );
                TraceLevel::Error
            }
            None => {
                tracing::info!(message_id = %self.message_id, trace = %text, "message trace");
                TraceLevel::Info
            }
        };

        Some(TraceLine { level, text })
    }
}

/// Snapshot of message counts in a queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    /// Receivable right now.
    pub visible: usize,
    /// Received and not yet deleted, or waiting out a visibility delay.
    pub in_flight: usize,
    /// Deleted (acknowledged) since the queue was created.
    pub deleted: usize,
    /// Moved aside by the redrive policy.
    pub dead_lettered: usize,
}
