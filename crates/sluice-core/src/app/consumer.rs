//! QueueConsumer - receive, dispatch, acknowledge.
//!
//! # Flow (one iteration of `read`)
//! 1. Stop if cancellation was requested
//! 2. Receive a batch (transport errors are logged and the poll is retried)
//! 3. Spawn one task per envelope: trace → handler → decider → ack/nack
//! 4. Wait for the whole batch before polling again

use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::app::handler::{MessageContext, MessageHandler};
use crate::domain::decision::{Decider, Decision, DefaultDecider};
use crate::domain::envelope::Envelope;
use crate::domain::retry::RetryPolicy;
use crate::ports::{QueueTransport, TransportError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerOptions {
    pub queue_url: String,
    /// Upper bound on one batch.
    pub max_messages: u32,
    /// Long-poll wait per receive.
    pub wait_time_secs: u32,
    /// Receive count at which retriable failures are redriven. `None` or
    /// `Some(0)` retries forever.
    pub max_retries: Option<u32>,
}

impl Default for ConsumerOptions {
    fn default() -> Self {
        Self {
            queue_url: String::new(),
            max_messages: 5,
            wait_time_secs: 10,
            max_retries: None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsumerError {
    #[error("consumer cancelled")]
    Cancelled,
}

/// Consumer bound to one queue.
///
/// Cloning is cheap; every spawned message task holds its own clone.
#[derive(Clone)]
pub struct QueueConsumer {
    transport: Arc<dyn QueueTransport>,
    options: ConsumerOptions,
    decider: Arc<dyn Decider>,
}

impl QueueConsumer {
    pub fn new(transport: Arc<dyn QueueTransport>, options: ConsumerOptions) -> Self {
        let decider = DefaultDecider::new(RetryPolicy::new(options.max_retries));
        Self {
            transport,
            options,
            decider: Arc::new(decider),
        }
    }

    pub fn with_decider(mut self, decider: Arc<dyn Decider>) -> Self {
        self.decider = decider;
        self
    }

    pub fn options(&self) -> &ConsumerOptions {
        &self.options
    }

    /// One long-poll receive. An empty batch is not an error.
    pub async fn receive(&self) -> Result<Vec<Envelope>, TransportError> {
        let messages = self
            .transport
            .receive(self.options.max_messages, self.options.wait_time_secs)
            .await?;

        Ok(messages.into_iter().map(Envelope::from_transport).collect())
    }

    pub async fn ack(&self, envelope: &Envelope) -> Result<(), TransportError> {
        self.transport.delete(envelope.ack_token()).await
    }

    /// Make the message visible again after `delay_secs`.
    ///
    /// 0 releases it immediately (redrive); a negative delay does nothing.
    pub async fn nack(&self, envelope: &Envelope, delay_secs: i32) -> Result<(), TransportError> {
        let Ok(delay_secs) = u32::try_from(delay_secs) else {
            return Ok(());
        };
        self.transport
            .change_visibility(envelope.ack_token(), delay_secs)
            .await
    }

    /// Consume until `cancel` fires.
    ///
    /// Always ends with [`ConsumerError::Cancelled`]. Tasks already spawned
    /// for the current batch are detached, not aborted: they still run to
    /// completion and settle their messages.
    pub async fn read<H>(
        &self,
        cancel: &CancellationToken,
        handler: Arc<H>,
    ) -> Result<(), ConsumerError>
    where
        H: MessageHandler + ?Sized + 'static,
    {
        tracing::info!(
            queue_url = %self.options.queue_url,
            max_messages = self.options.max_messages,
            wait_time_secs = self.options.wait_time_secs,
            "consumer started"
        );

        loop {
            if cancel.is_cancelled() {
                tracing::info!(queue_url = %self.options.queue_url, "consumer stopped");
                return Err(ConsumerError::Cancelled);
            }

            let envelopes = match self.receive().await {
                Ok(envelopes) => envelopes,
                Err(err) => {
                    tracing::warn!(queue_url = %self.options.queue_url, error = %err, "failed to receive messages");
                    tokio::task::yield_now().await;
                    continue;
                }
            };

            if envelopes.is_empty() {
                tokio::task::yield_now().await;
                continue;
            }
            tracing::debug!(count = envelopes.len(), "received batch");

            let mut batch = JoinSet::new();
            for envelope in envelopes {
                if cancel.is_cancelled() {
                    batch.detach_all();
                    tracing::info!(queue_url = %self.options.queue_url, "consumer stopped mid-batch");
                    return Err(ConsumerError::Cancelled);
                }

                let consumer = self.clone();
                let handler = Arc::clone(&handler);
                batch.spawn(async move { consumer.dispatch(&*handler, envelope).await });
            }

            while let Some(joined) = batch.join_next().await {
                if let Err(err) = joined {
                    tracing::error!(error = %err, "message task failed");
                }
            }
        }
    }

    /// Run one attempt and settle the message.
    async fn dispatch<H>(&self, handler: &H, envelope: Envelope) -> Decision
    where
        H: MessageHandler + ?Sized,
    {
        let ctx = MessageContext::traced(&envelope);
        ctx.append(format!("started, attempt {}", envelope.receive_count()));

        let result = handler.handle(&ctx, &envelope).await;
        ctx.flush(result.as_ref().err());

        let decision = self.decider.decide(envelope.receive_count(), &result);
        self.settle(&envelope, &decision).await;
        decision
    }

    async fn settle(&self, envelope: &Envelope, decision: &Decision) {
        match decision {
            Decision::Ack => {
                if let Err(err) = self.ack(envelope).await {
                    tracing::error!(message_id = %envelope.id(), error = %err, "failed to delete message");
                }
            }
            Decision::Retry { .. } | Decision::Redrive => {
                let delay_secs = decision.delay_secs().unwrap_or(0);
                if *decision == Decision::Redrive {
                    tracing::warn!(
                        message_id = %envelope.id(),
                        receive_count = envelope.receive_count(),
                        "max retries reached, releasing message for redrive"
                    );
                }
                if let Err(err) = self.nack(envelope, delay_secs).await {
                    tracing::error!(
                        message_id = %envelope.id(),
                        delay_secs,
                        error = %err,
                        "failed to change message visibility"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::envelope::{RECEIVE_COUNT_ATTRIBUTE, TransportMessage};
    use crate::domain::errors::{FailureCause, ProcessError};
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Delete(String),
        ChangeVisibility(String, u32),
    }

    /// Replays scripted receive results, then cancels the token.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<Vec<TransportMessage>, TransportError>>>,
        calls: Mutex<Vec<Call>>,
        receives: AtomicUsize,
        cancel: CancellationToken,
        on_receive: Box<dyn Fn(usize) + Send + Sync>,
    }

    impl ScriptedTransport {
        fn new(
            cancel: &CancellationToken,
            script: Vec<Result<Vec<TransportMessage>, TransportError>>,
        ) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
                receives: AtomicUsize::new(0),
                cancel: cancel.clone(),
                on_receive: Box::new(|_| {}),
            }
        }

        fn on_receive(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
            self.on_receive = Box::new(hook);
            self
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QueueTransport for ScriptedTransport {
        async fn receive(
            &self,
            _max_messages: u32,
            _wait_secs: u32,
        ) -> Result<Vec<TransportMessage>, TransportError> {
            let n = self.receives.fetch_add(1, Ordering::SeqCst);
            (self.on_receive)(n);
            match self.script.lock().unwrap().pop_front() {
                Some(result) => result,
                None => {
                    self.cancel.cancel();
                    Ok(Vec::new())
                }
            }
        }

        async fn delete(&self, ack_token: &str) -> Result<(), TransportError> {
            self.calls.lock().unwrap().push(Call::Delete(ack_token.to_string()));
            Ok(())
        }

        async fn change_visibility(
            &self,
            ack_token: &str,
            delay_secs: u32,
        ) -> Result<(), TransportError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::ChangeVisibility(ack_token.to_string(), delay_secs));
            Ok(())
        }
    }

    /// Outcome picked from the message body: `ok`, `retry` or `drop`.
    struct BodyHandler {
        handled: AtomicUsize,
    }

    impl BodyHandler {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                handled: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl MessageHandler for BodyHandler {
        async fn handle(&self, ctx: &MessageContext, envelope: &Envelope) -> Result<(), ProcessError> {
            self.handled.fetch_add(1, Ordering::SeqCst);
            ctx.append("handled");
            match envelope.body() {
                b"ok" => Ok(()),
                b"drop" => Err(ProcessError::non_retriable(FailureCause::InvalidHeader)),
                _ => Err(ProcessError::other("try again")),
            }
        }
    }

    fn message(id: &str, body: &str, receive_count: u32) -> TransportMessage {
        TransportMessage {
            message_id: id.to_string(),
            body: body.as_bytes().to_vec(),
            attributes: HashMap::from([(
                RECEIVE_COUNT_ATTRIBUTE.to_string(),
                receive_count.to_string(),
            )]),
            receipt_handle: format!("rh-{id}"),
        }
    }

    fn options(max_retries: Option<u32>) -> ConsumerOptions {
        ConsumerOptions {
            queue_url: "memory://test".to_string(),
            max_retries,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn decisions_are_applied_per_message() {
        let cancel = CancellationToken::new();
        let transport = Arc::new(ScriptedTransport::new(
            &cancel,
            vec![Ok(vec![
                message("a", "ok", 1),
                message("b", "drop", 1),
                message("c", "retry", 2),
            ])],
        ));
        let consumer = QueueConsumer::new(transport.clone(), options(Some(5)));

        let result = consumer.read(&cancel, BodyHandler::new()).await;
        assert_eq!(result, Err(ConsumerError::Cancelled));

        let mut calls = transport.calls();
        calls.sort_by_key(|call| format!("{call:?}"));
        assert_eq!(
            calls,
            vec![
                Call::ChangeVisibility("rh-c".to_string(), 60),
                Call::Delete("rh-a".to_string()),
                Call::Delete("rh-b".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn retriable_at_max_retries_is_released_immediately() {
        let cancel = CancellationToken::new();
        let transport = Arc::new(ScriptedTransport::new(
            &cancel,
            vec![Ok(vec![message("a", "retry", 3)])],
        ));
        let consumer = QueueConsumer::new(transport.clone(), options(Some(3)));

        let _ = consumer.read(&cancel, BodyHandler::new()).await;

        assert_eq!(
            transport.calls(),
            vec![Call::ChangeVisibility("rh-a".to_string(), 0)]
        );
    }

    #[tokio::test]
    async fn zero_max_retries_keeps_backing_off() {
        let cancel = CancellationToken::new();
        let transport = Arc::new(ScriptedTransport::new(
            &cancel,
            vec![Ok(vec![message("a", "retry", 40)])],
        ));
        let consumer = QueueConsumer::new(transport.clone(), options(Some(0)));

        let _ = consumer.read(&cancel, BodyHandler::new()).await;

        assert_eq!(
            transport.calls(),
            vec![Call::ChangeVisibility("rh-a".to_string(), 30_720)]
        );
    }

    #[tokio::test]
    async fn cancelled_before_start_never_polls() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let transport = Arc::new(ScriptedTransport::new(&cancel, vec![]));
        let consumer = QueueConsumer::new(transport.clone(), options(None));

        let result = consumer.read(&cancel, BodyHandler::new()).await;

        assert_eq!(result, Err(ConsumerError::Cancelled));
        assert_eq!(transport.receives.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancellation_during_receive_spawns_nothing() {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let transport = Arc::new(
            ScriptedTransport::new(&cancel, vec![Ok(vec![message("a", "ok", 1), message("b", "ok", 1)])])
                .on_receive(move |_| token.cancel()),
        );
        let consumer = QueueConsumer::new(transport.clone(), options(None));
        let handler = BodyHandler::new();

        let result = consumer.read(&cancel, handler.clone()).await;

        assert_eq!(result, Err(ConsumerError::Cancelled));
        assert_eq!(transport.receives.load(Ordering::SeqCst), 1);
        assert_eq!(handler.handled.load(Ordering::SeqCst), 0);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn receive_errors_are_retried() {
        let cancel = CancellationToken::new();
        let transport = Arc::new(ScriptedTransport::new(
            &cancel,
            vec![
                Err(TransportError::Unavailable("connection reset".to_string())),
                Ok(vec![message("a", "ok", 1)]),
            ],
        ));
        let consumer = QueueConsumer::new(transport.clone(), options(None));

        let _ = consumer.read(&cancel, BodyHandler::new()).await;

        assert_eq!(transport.calls(), vec![Call::Delete("rh-a".to_string())]);
        assert_eq!(transport.receives.load(Ordering::SeqCst), 3);
    }

    /// Sleeps per message and counts completions.
    struct SlowHandler {
        finished: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl MessageHandler for SlowHandler {
        async fn handle(&self, _ctx: &MessageContext, envelope: &Envelope) -> Result<(), ProcessError> {
            let millis: u64 = std::str::from_utf8(envelope.body())
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(millis)).await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn next_poll_waits_for_the_whole_batch() {
        let cancel = CancellationToken::new();
        let finished = Arc::new(AtomicUsize::new(0));
        let seen_at_poll = Arc::new(Mutex::new(Vec::new()));

        let transport = {
            let finished = Arc::clone(&finished);
            let seen_at_poll = Arc::clone(&seen_at_poll);
            Arc::new(
                ScriptedTransport::new(
                    &cancel,
                    vec![Ok(vec![
                        message("a", "40", 1),
                        message("b", "5", 1),
                        message("c", "20", 1),
                    ])],
                )
                .on_receive(move |_| {
                    seen_at_poll
                        .lock()
                        .unwrap()
                        .push(finished.load(Ordering::SeqCst));
                }),
            )
        };
        let consumer = QueueConsumer::new(transport.clone(), options(None));
        let handler = Arc::new(SlowHandler {
            finished: Arc::clone(&finished),
        });

        let _ = consumer.read(&cancel, handler).await;

        assert_eq!(*seen_at_poll.lock().unwrap(), vec![0, 3]);
        assert_eq!(transport.calls().len(), 3);
    }

    #[tokio::test]
    async fn nack_delay_semantics() {
        let cancel = CancellationToken::new();
        let transport = Arc::new(ScriptedTransport::new(&cancel, vec![]));
        let consumer = QueueConsumer::new(transport.clone(), options(None));
        let envelope = Envelope::from_transport(message("a", "ok", 1));

        consumer.nack(&envelope, -1).await.unwrap();
        assert!(transport.calls().is_empty());

        consumer.nack(&envelope, 0).await.unwrap();
        consumer.nack(&envelope, 90).await.unwrap();
        assert_eq!(
            transport.calls(),
            vec![
                Call::ChangeVisibility("rh-a".to_string(), 0),
                Call::ChangeVisibility("rh-a".to_string(), 90),
            ]
        );
    }

    #[tokio::test]
    async fn receive_translates_messages() {
        let cancel = CancellationToken::new();
        let transport = Arc::new(ScriptedTransport::new(
            &cancel,
            vec![Ok(vec![message("a", "ok", 4)])],
        ));
        let consumer = QueueConsumer::new(transport, options(None));

        let envelopes = consumer.receive().await.unwrap();

        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].id(), "a");
        assert_eq!(envelopes[0].ack_token(), "rh-a");
        assert_eq!(envelopes[0].receive_count(), 4);
    }
}
