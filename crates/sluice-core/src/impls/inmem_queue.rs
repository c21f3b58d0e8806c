//! InMemoryQueue - development queue with visibility-timeout semantics.
//!
//! # Semantics
//! - a received message stays invisible for the visibility timeout, then
//!   becomes receivable again unless it was deleted
//! - every delivery gets a fresh receipt handle; handles from earlier
//!   deliveries are rejected
//! - `ApproximateReceiveCount` is incremented on every delivery
//! - `receive` long-polls up to `wait_secs`, waking early on `send` or when a
//!   delayed message becomes visible
//! - with a redrive limit set, a message that has already been delivered that
//!   many times is moved to the dead-letter list instead of being delivered

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;
use tokio::time::Instant;
use ulid::Ulid;

use crate::domain::envelope::{RECEIVE_COUNT_ATTRIBUTE, TransportMessage};
use crate::observability::QueueCounts;
use crate::ports::{QueueTransport, TransportError};

pub const SENT_TIMESTAMP_ATTRIBUTE: &str = "SentTimestamp";

#[derive(Debug, Clone)]
struct StoredMessage {
    message_id: String,
    body: Vec<u8>,
    sent_at_ms: i64,
    receive_count: u32,
    visible_at: Instant,
    receipt: Option<String>,
}

impl StoredMessage {
    fn to_transport(&self) -> TransportMessage {
        let attributes = HashMap::from([
            (
                RECEIVE_COUNT_ATTRIBUTE.to_string(),
                self.receive_count.to_string(),
            ),
            (
                SENT_TIMESTAMP_ATTRIBUTE.to_string(),
                self.sent_at_ms.to_string(),
            ),
        ]);
        TransportMessage {
            message_id: self.message_id.clone(),
            body: self.body.clone(),
            attributes,
            receipt_handle: self.receipt.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default)]
struct QueueState {
    /// In send order.
    messages: Vec<StoredMessage>,
    dead_letters: Vec<StoredMessage>,
    deleted: usize,
}

pub struct InMemoryQueue {
    visibility_timeout: Duration,
    max_receive_count: Option<u32>,
    state: Mutex<QueueState>,
    notify: Notify,
}

impl InMemoryQueue {
    pub fn new(visibility_timeout: Duration) -> Self {
        Self {
            visibility_timeout,
            max_receive_count: None,
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
        }
    }

    /// Move messages aside once they have been delivered `max_receive_count`
    /// times and are about to be delivered again.
    pub fn with_redrive(mut self, max_receive_count: u32) -> Self {
        self.max_receive_count = Some(max_receive_count).filter(|&n| n > 0);
        self
    }

    /// Enqueue a message; returns its id.
    pub fn send(&self, body: impl Into<Vec<u8>>) -> String {
        let message_id = Ulid::new().to_string();
        {
            let mut state = self.lock();
            state.messages.push(StoredMessage {
                message_id: message_id.clone(),
                body: body.into(),
                sent_at_ms: Utc::now().timestamp_millis(),
                receive_count: 0,
                visible_at: Instant::now(),
                receipt: None,
            });
        }
        self.notify.notify_waiters();
        message_id
    }

    pub fn counts(&self) -> QueueCounts {
        let now = Instant::now();
        let state = self.lock();
        let visible = state
            .messages
            .iter()
            .filter(|m| m.visible_at <= now)
            .count();

        QueueCounts {
            visible,
            in_flight: state.messages.len() - visible,
            deleted: state.deleted,
            dead_lettered: state.dead_letters.len(),
        }
    }

    /// Messages moved aside by the redrive limit.
    pub fn dead_letters(&self) -> Vec<TransportMessage> {
        self.lock()
            .dead_letters
            .iter()
            .map(StoredMessage::to_transport)
            .collect()
    }

    /// Messages neither deleted nor dead-lettered.
    pub fn len(&self) -> usize {
        self.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Deliver up to `max` visible messages, or report when the next one
    /// becomes visible.
    fn take_visible(&self, max: usize) -> (Vec<TransportMessage>, Option<Instant>) {
        let now = Instant::now();
        let mut state = self.lock();

        if let Some(limit) = self.max_receive_count {
            let (dead, live): (Vec<_>, Vec<_>) = std::mem::take(&mut state.messages)
                .into_iter()
                .partition(|m| m.visible_at <= now && m.receive_count >= limit);
            state.messages = live;
            for message in dead {
                tracing::warn!(
                    message_id = %message.message_id,
                    receive_count = message.receive_count,
                    "message moved to dead-letter list"
                );
                state.dead_letters.push(message);
            }
        }

        let mut batch = Vec::new();
        for message in state.messages.iter_mut() {
            if batch.len() >= max {
                break;
            }
            if message.visible_at > now {
                continue;
            }
            message.receive_count = message.receive_count.saturating_add(1);
            message.receipt = Some(Ulid::new().to_string());
            message.visible_at = now + self.visibility_timeout;
            batch.push(message.to_transport());
        }

        let next_visible = state.messages.iter().map(|m| m.visible_at).min();
        (batch, next_visible)
    }

    fn find_by_receipt(state: &QueueState, ack_token: &str) -> Result<usize, TransportError> {
        state
            .messages
            .iter()
            .position(|m| m.receipt.as_deref() == Some(ack_token))
            .ok_or_else(|| TransportError::InvalidReceipt(ack_token.to_string()))
    }
}

#[async_trait]
impl QueueTransport for InMemoryQueue {
    async fn receive(
        &self,
        max_messages: u32,
        wait_secs: u32,
    ) -> Result<Vec<TransportMessage>, TransportError> {
        let max = usize::try_from(max_messages.max(1)).unwrap_or(1);
        let deadline = Instant::now() + Duration::from_secs(u64::from(wait_secs));

        loop {
            // registered before the check so a concurrent send is not missed
            let notified = self.notify.notified();

            let (batch, next_visible) = self.take_visible(max);
            if !batch.is_empty() {
                return Ok(batch);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }

            let wake_at = next_visible
                .filter(|at| *at > now)
                .map_or(deadline, |at| at.min(deadline));
            tokio::select! {
                _ = notified => {}
                _ = tokio::time::sleep_until(wake_at) => {}
            }
        }
    }

    async fn delete(&self, ack_token: &str) -> Result<(), TransportError> {
        let mut state = self.lock();
        let index = Self::find_by_receipt(&state, ack_token)?;
        state.messages.remove(index);
        state.deleted += 1;
        Ok(())
    }

    async fn change_visibility(
        &self,
        ack_token: &str,
        delay_secs: u32,
    ) -> Result<(), TransportError> {
        {
            let mut state = self.lock();
            let index = Self::find_by_receipt(&state, ack_token)?;
            let message = &mut state.messages[index];
            message.visible_at = Instant::now() + Duration::from_secs(u64::from(delay_secs));
            if delay_secs == 0 {
                message.receipt = None;
            }
        }
        if delay_secs == 0 {
            self.notify.notify_waiters();
        }
        Ok(())
    }
}
