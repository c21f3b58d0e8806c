//! Demo envelopes for local runs against the in-memory queue.

use chrono::Utc;
use serde_json::{Value, json};
use ulid::Ulid;

use sluice_core::impls::InMemoryQueue;
use sluice_core::schema::{EventPayload, OrderPlacedV1, PaymentProcessedV1, UserCreatedV1};

/// Envelope body number `n`, cycling through the built-in event types.
pub fn demo_event(n: usize) -> Value {
    let (event_type, body) = match n % 3 {
        0 => (
            UserCreatedV1::EVENT_TYPE,
            json!({
                "user_id": format!("user-{n}"),
                "email": format!("user{n}@example.com"),
                "name": format!("User {n}"),
                "role": "member",
                "verified": n % 2 == 0
            }),
        ),
        1 => (
            OrderPlacedV1::EVENT_TYPE,
            json!({
                "order_id": format!("order-{n}"),
                "user_id": format!("user-{}", n - 1),
                "total": 19.99 + n as f64,
                "items_count": (n % 5) + 1,
                "status": "placed"
            }),
        ),
        _ => (
            PaymentProcessedV1::EVENT_TYPE,
            json!({
                "payment_id": format!("payment-{n}"),
                "order_id": format!("order-{}", n - 1),
                "amount": 19.99 + (n - 1) as f64,
                "payment_method": "card",
                "status": "captured"
            }),
        ),
    };

    json!({
        "event_id": Ulid::new().to_string(),
        "event_type": event_type,
        "tenant_id": "tenant-demo",
        "client_id": "client-demo",
        "schema_version": "v1",
        "occurred_at": Utc::now().to_rfc3339(),
        "body": body
    })
}

/// Send `count` demo envelopes; returns how many were sent.
pub fn seed(queue: &InMemoryQueue, count: usize) -> anyhow::Result<usize> {
    for n in 0..count {
        queue.send(serde_json::to_vec(&demo_event(n))?);
    }
    Ok(count)
}
