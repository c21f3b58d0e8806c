//! End-to-end: in-memory queue → consumer → processor → in-memory store.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use sluice_core::app::{App, AppBuilder, ConsumerError, ConsumerOptions};
use sluice_core::domain::{OutcomeRecord, RecordStatus};
use sluice_core::impls::{InMemoryQueue, InMemoryRecordStore};
use sluice_core::ports::{RecordStore, StoreError};

fn event(event_id: &str, event_type: &str, body: Value) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "event_id": event_id,
        "event_type": event_type,
        "tenant_id": "tenant-1",
        "client_id": "client-1",
        "schema_version": "v1",
        "occurred_at": "2024-01-01T12:00:00Z",
        "body": body
    }))
    .unwrap()
}

fn user_created(event_id: &str) -> Vec<u8> {
    event(
        event_id,
        "user.created",
        json!({"user_id": "u-1", "email": "ada@example.com", "name": "Ada", "role": "admin"}),
    )
}

fn options(max_retries: Option<u32>) -> ConsumerOptions {
    ConsumerOptions {
        queue_url: "memory://events".to_string(),
        max_messages: 5,
        wait_time_secs: 1,
        max_retries,
    }
}

fn build(queue: &Arc<InMemoryQueue>, store: Arc<dyn RecordStore>, max_retries: Option<u32>) -> App {
    AppBuilder::new()
        .with_builtin_schemas()
        .expect_schemas(&["user.created/v1", "order.placed/v1", "payment.processed/v1"])
        .options(options(max_retries))
        .build(queue.clone(), store)
        .unwrap()
}

/// Run the app until `done` holds, then cancel and return the read result.
async fn run_until(app: App, done: impl Fn() -> bool) -> Result<(), ConsumerError> {
    let cancel = CancellationToken::new();
    let app = Arc::new(app);
    let handle = {
        let app = Arc::clone(&app);
        let cancel = cancel.clone();
        tokio::spawn(async move { app.run(&cancel).await })
    };

    tokio::time::timeout(Duration::from_secs(24 * 3600), async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("pipeline did not settle");

    cancel.cancel();
    handle.await.unwrap()
}

/// Fails the first `failures` saves, then delegates.
struct FlakyStore {
    failures: AtomicUsize,
    inner: InMemoryRecordStore,
    attempts: AtomicUsize,
}

impl FlakyStore {
    fn new(failures: usize) -> Self {
        Self {
            failures: AtomicUsize::new(failures),
            inner: InMemoryRecordStore::new(),
            attempts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn save(&self, record: &OutcomeRecord) -> Result<(), StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let left = self.failures.load(Ordering::SeqCst);
        if left > 0 {
            self.failures.store(left - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("throttled".to_string()));
        }
        self.inner.save(record).await
    }
}

#[tokio::test(start_paused = true)]
async fn mixed_batch_is_settled_and_audited() {
    let queue = Arc::new(InMemoryQueue::new(Duration::from_secs(30)));
    let store = Arc::new(InMemoryRecordStore::new());

    queue.send(user_created("evt-ok"));
    queue.send(b"{definitely not json".to_vec());
    queue.send(event("evt-unknown", "user.deleted", json!({"user_id": "u-1"})));
    queue.send(event(
        "evt-invalid",
        "payment.processed",
        json!({"payment_id": "p-1", "order_id": "o-1", "amount": 0, "payment_method": "card", "status": "ok"}),
    ));
    let mut missing_tenant: Value = serde_json::from_slice(&user_created("evt-no-tenant")).unwrap();
    missing_tenant.as_object_mut().unwrap().remove("tenant_id");
    queue.send(serde_json::to_vec(&missing_tenant).unwrap());

    let app = build(&queue, store.clone(), Some(3));
    let result = run_until(app, || queue.counts().deleted == 5).await;

    assert_eq!(result, Err(ConsumerError::Cancelled));
    assert!(queue.is_empty());

    // malformed header leaves no record
    let records = store.records();
    assert_eq!(records.len(), 4);

    let status_of = |event_id: &str| {
        records
            .iter()
            .find(|r| r.event_id == event_id)
            .map(|r| r.status)
    };
    assert_eq!(status_of("evt-ok"), Some(RecordStatus::Processed));
    assert_eq!(status_of("evt-unknown"), Some(RecordStatus::Failed));
    assert_eq!(status_of("evt-invalid"), Some(RecordStatus::Failed));
    assert_eq!(status_of("evt-no-tenant"), Some(RecordStatus::Failed));
}

#[tokio::test(start_paused = true)]
async fn storage_outage_is_retried_with_backoff() {
    let queue = Arc::new(InMemoryQueue::new(Duration::from_secs(30)));
    let store = Arc::new(FlakyStore::new(2));

    queue.send(user_created("evt-1"));

    let started = tokio::time::Instant::now();
    let app = build(&queue, store.clone(), Some(5));
    let _ = run_until(app, || queue.counts().deleted == 1).await;

    // attempt 1 waits 30s, attempt 2 waits 60s, attempt 3 succeeds
    assert_eq!(store.attempts.load(Ordering::SeqCst), 3);
    assert!(started.elapsed() >= Duration::from_secs(90));

    let records = store.inner.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, RecordStatus::Processed);
}

#[tokio::test(start_paused = true)]
async fn exhausted_message_is_redriven_by_the_queue() {
    let queue = Arc::new(InMemoryQueue::new(Duration::from_secs(30)).with_redrive(2));
    let store = Arc::new(FlakyStore::new(usize::MAX));

    queue.send(user_created("evt-poison"));

    let app = build(&queue, store.clone(), Some(2));
    let _ = run_until(app, || queue.counts().dead_lettered == 1).await;

    assert_eq!(store.attempts.load(Ordering::SeqCst), 2);
    assert!(queue.is_empty());
    assert_eq!(queue.counts().deleted, 0);
    assert!(store.inner.is_empty());
}
