//! End-to-end scenarios S1–S6 and a handful of the testable properties
//! from the design docs, driven against a real Postgres instance with
//! `pgmq`, `pg_cron`, and `pg_partman` installed.
//!
//! Every test here needs a live database and is gated behind both
//! `#[ignore]` and a `DATABASE_URL` check at the top of the test body —
//! the same opt-in-integration convention the rest of this workspace
//! uses for anything that needs a running service. Run with:
//!
//! ```text
//! DATABASE_URL=postgres://... cargo test -p corebus --test end_to_end -- --ignored
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use corebus::prelude::*;
use corebus_events::Handler;
use sqlx::PgConnection;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

fn database_url() -> Option<String> {
    match std::env::var("DATABASE_URL") {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("skipping: DATABASE_URL not set");
            None
        }
    }
}

async fn connect(namespace: &str) -> CoreSystem {
    let url = database_url().expect("DATABASE_URL must be set for this test");
    let options = ConnectOptions::new(url, namespace);
    CoreSystem::connect(options).await.expect("connect should succeed against a prepared database")
}

/// A second, independent pool used only to assert on queue/table state
/// from outside `CoreSystem` — mirrors how an operator would inspect the
/// same namespace with a plain `psql`/`pgmq` client.
async fn raw_pool() -> sqlx::PgPool {
    let url = database_url().expect("DATABASE_URL must be set for this test");
    sqlx::PgPool::connect(&url).await.expect("raw assertion pool should connect")
}

struct QueueRow {
    message: serde_json::Value,
    read_ct: i32,
}

/// Peeks at `queue_name`'s underlying `pgmq.q_<queue_name>` table directly
/// rather than calling `pgmq.read`, so inspecting the queue for an
/// assertion never itself perturbs `read_ct`/visibility state.
async fn read_queue(pool: &sqlx::PgPool, queue_name: &str, qty: i32) -> Vec<QueueRow> {
    let sql = format!("SELECT message, read_ct FROM pgmq.q_{queue_name} ORDER BY msg_id LIMIT $1");
    let rows: Vec<(serde_json::Value, i32)> = sqlx::query_as(&sql)
        .bind(qty as i64)
        .fetch_all(pool)
        .await
        .expect("reading the pgmq-backed queue table should succeed");
    rows.into_iter().map(|(message, read_ct)| QueueRow { message, read_ct }).collect()
}

async fn node_heartbeat(pool: &sqlx::PgPool, node_id: &str) -> DateTime<Utc> {
    let (last_heartbeat,): (DateTime<Utc>,) = sqlx::query_as("SELECT last_heartbeat FROM core.nodes WHERE node_id = $1")
        .bind(node_id)
        .fetch_one(pool)
        .await
        .expect("node row should exist");
    last_heartbeat
}

struct RecordingHandler {
    seen: Arc<Mutex<Vec<EventEnvelope>>>,
}

#[async_trait]
impl Handler for RecordingHandler {
    async fn handle(&self, envelope: &EventEnvelope, _conn: &mut PgConnection) -> Result<(), HandlerError> {
        self.seen.lock().await.push(envelope.clone());
        Ok(())
    }
}

struct FailingHandler;

#[async_trait]
impl Handler for FailingHandler {
    async fn handle(&self, _envelope: &EventEnvelope, _conn: &mut PgConnection) -> Result<(), HandlerError> {
        Err(HandlerError::new("boom"))
    }
}

struct CountingHandler {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Handler for CountingHandler {
    async fn handle(&self, _envelope: &EventEnvelope, _conn: &mut PgConnection) -> Result<(), HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// S1 — single subscriber, single emit.
#[tokio::test]
#[ignore]
async fn s1_single_subscriber_single_emit() {
    if database_url().is_none() {
        return;
    }
    let system = connect("corebus_test_s1").await;
    let node_a = system.create_node("A", None, None, serde_json::json!({})).await.unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    node_a.on_event("user.created", Arc::new(RecordingHandler { seen: seen.clone() })).await;

    let message_id = node_a.emit("user.created", serde_json::json!({"userId": "123"})).await.unwrap();

    tokio::time::sleep(Duration::from_millis(2_500)).await;

    let seen = seen.lock().await;
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].payload["userId"], "123");
    assert_eq!(seen[0].producer_node_id, "A");
    assert_eq!(seen[0].message_id, Some(message_id.as_i64()));

    system.close().await;
}

/// S2 — handler failure routes to the DLQ and rolls back.
#[tokio::test]
#[ignore]
async fn s2_handler_failure_moves_to_dlq() {
    if database_url().is_none() {
        return;
    }
    let system = connect("corebus_test_s2").await;
    let node_a = system.create_node("A", None, None, serde_json::json!({})).await.unwrap();
    node_a.on_event("user.created", Arc::new(FailingHandler)).await;

    node_a.emit("user.created", serde_json::json!({"userId": "123"})).await.unwrap();

    tokio::time::sleep(Duration::from_millis(2_500)).await;

    let pool = raw_pool().await;
    let dlq_messages = read_queue(&pool, "core_events_corebus_test_s2_dlq", 10).await;
    assert_eq!(dlq_messages.len(), 1, "exactly one dead-letter payload expected");
    let dlq_message = &dlq_messages[0].message;
    assert_eq!(dlq_message["reason"], "Handler execution error");
    assert_eq!(dlq_message["originalEvent"]["eventType"], "user.created");
    assert!(dlq_message["error"].as_str().unwrap().contains("boom"));

    let main_queue = read_queue(&pool, "core_events_corebus_test_s2", 10).await;
    assert!(main_queue.is_empty(), "main queue must be empty: the original message was acked after the DLQ move");

    system.close().await;
}

/// S4 — broadcast fan-out skips the producer and ignores event type.
#[tokio::test]
#[ignore]
async fn s4_broadcast_fan_out() {
    if database_url().is_none() {
        return;
    }
    let system = connect("corebus_test_s4").await;
    let node_a = system.create_node("A", None, None, serde_json::json!({})).await.unwrap();
    let node_b = system.create_node("B", None, None, serde_json::json!({})).await.unwrap();

    let a_calls = Arc::new(AtomicUsize::new(0));
    let b_calls = Arc::new(AtomicUsize::new(0));
    let b2_calls = Arc::new(AtomicUsize::new(0));

    node_a.on_event("x", Arc::new(CountingHandler { calls: a_calls.clone() })).await;
    node_b.on_event("y", Arc::new(CountingHandler { calls: b_calls.clone() })).await;
    node_b.on_event("z", Arc::new(CountingHandler { calls: b2_calls.clone() })).await;

    node_a.emit_broadcast("x", serde_json::json!({})).await.unwrap();

    tokio::time::sleep(Duration::from_millis(2_500)).await;

    assert_eq!(a_calls.load(Ordering::SeqCst), 0, "producer must be skipped");
    assert_eq!(b_calls.load(Ordering::SeqCst), 1);
    assert_eq!(b2_calls.load(Ordering::SeqCst), 1);

    system.close().await;
}

/// S3 — cron-driven emission.
#[tokio::test]
#[ignore]
async fn s3_cron_driven_emission() {
    if database_url().is_none() {
        return;
    }
    let system = connect("corebus_test_s3").await;
    let node_a = system.create_node("A", None, None, serde_json::json!({})).await.unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    node_a.on_event("cleanup.daily", Arc::new(RecordingHandler { seen: seen.clone() })).await;

    let task = node_a
        .schedule_task("daily", "* * * * *", "cleanup.daily", &serde_json::json!({"retentionDays": 30}), None)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(75)).await;

    let seen = seen.lock().await;
    assert!(!seen.is_empty(), "cron job should have fired at least once within 75s");
    let envelope = &seen[0];
    assert_eq!(envelope.producer_node_id, "scheduler");
    assert_eq!(envelope.scheduled_task_id, Some(task.task_id));
    assert_eq!(envelope.payload["retentionDays"], 30);

    system.close().await;
}

/// Testable property 9 — no-handler redelivery, never DLQ'd on that
/// basis alone.
#[tokio::test]
#[ignore]
async fn no_handler_redelivers_instead_of_dlq() {
    if database_url().is_none() {
        return;
    }
    let system = connect("corebus_test_no_handler").await;
    // Register and immediately unregister a handler for an unrelated type
    // so the registry isn't empty (an empty registry makes the consumer
    // skip polling entirely, per §4.5.1 step 1) while `orphan` itself has
    // no handler.
    let node_a = system.create_node("A", None, None, serde_json::json!({})).await.unwrap();
    let keepalive = Arc::new(AtomicUsize::new(0));
    node_a.on_event("keepalive", Arc::new(CountingHandler { calls: keepalive })).await;

    node_a.emit("orphan", serde_json::json!({})).await.unwrap();

    // Wait past the default 30s visibility timeout twice; the message
    // should still be sitting in the queue, unconsumed and un-DLQ'd.
    tokio::time::sleep(Duration::from_secs(65)).await;

    let pool = raw_pool().await;
    let main_queue = read_queue(&pool, "core_events_corebus_test_no_handler", 10).await;
    assert_eq!(main_queue.len(), 1, "the orphan message must still be sitting in the main queue");
    assert_eq!(main_queue[0].message["eventType"], "orphan");
    assert!(main_queue[0].read_ct >= 1, "redelivery_count must have advanced past its initial consumer read");

    let dlq_messages = read_queue(&pool, "core_events_corebus_test_no_handler_dlq", 10).await;
    assert!(dlq_messages.is_empty(), "a missing-handler message must never be DLQ'd on that basis alone");

    system.close().await;
}

/// Testable property 11 — heartbeat advances at least once every 60s.
#[tokio::test]
#[ignore]
async fn heartbeat_advances() {
    if database_url().is_none() {
        return;
    }
    let system = connect("corebus_test_heartbeat").await;
    let node_a = system.create_node("A", None, None, serde_json::json!({})).await.unwrap();

    let pool = raw_pool().await;
    let initial_heartbeat = node_heartbeat(&pool, "A").await;

    node_a.start();
    tokio::time::sleep(Duration::from_secs(35)).await;

    let advanced_heartbeat = node_heartbeat(&pool, "A").await;
    assert!(
        advanced_heartbeat > initial_heartbeat,
        "last_heartbeat must advance at least once within a 30s heartbeat period"
    );

    node_a.stop();
    system.close().await;
}
