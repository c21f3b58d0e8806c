//! Handler contract and the per-attempt context passed alongside an envelope.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::envelope::Envelope;
use crate::domain::errors::ProcessError;
use crate::observability::{Trace, TraceLine};

/// Per-attempt context.
///
/// Carries the attempt's [`Trace`] explicitly instead of through task-local
/// state. A context built with [`MessageContext::untraced`] accepts appends
/// and flushes and silently drops them.
#[derive(Debug, Clone)]
pub struct MessageContext {
    message_id: String,
    receive_count: u32,
    trace: Option<Arc<Trace>>,
}

impl MessageContext {
    /// Context with a fresh trace for one delivery of `envelope`.
    pub fn traced(envelope: &Envelope) -> Self {
        Self {
            message_id: envelope.id().to_string(),
            receive_count: envelope.receive_count(),
            trace: Some(Arc::new(Trace::new(envelope.id()))),
        }
    }

    pub fn untraced(envelope: &Envelope) -> Self {
        Self {
            message_id: envelope.id().to_string(),
            receive_count: envelope.receive_count(),
            trace: None,
        }
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn receive_count(&self) -> u32 {
        self.receive_count
    }

    pub fn trace(&self) -> Option<&Arc<Trace>> {
        self.trace.as_ref()
    }

    pub fn append(&self, line: impl Into<String>) {
        if let Some(trace) = &self.trace {
            trace.append(line);
        }
    }

    pub fn flush(&self, error: Option<&ProcessError>) -> Option<TraceLine> {
        self.trace.as_ref().and_then(|trace| trace.flush(error))
    }
}

/// Processes one envelope.
///
/// The returned error's classification decides between acknowledging and
/// redelivering the message; the handler never touches the queue itself.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, ctx: &MessageContext, envelope: &Envelope) -> Result<(), ProcessError>;
}
