//! Thin wrapper around the `pgmq` SQL functions.
//!
//! `pgmq` ships no Rust client; every operation here is a runtime
//! `sqlx::query`/`query_as` call (matching the teacher's Postgres example
//! service style) rather than the compile-time `query!` macro, since the
//! macro would need `DATABASE_URL` available at workspace-build time and
//! this crate must build the same way anywhere.

use crate::error::{is_already_exists, GatewayError};
use crate::gateway::Gateway;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;

/// A single message read off a `pgmq` queue.
#[derive(Debug, Clone, FromRow)]
pub struct QueueMessage {
    pub msg_id: i64,
    pub read_ct: i32,
    pub enqueued_at: DateTime<Utc>,
    pub vt: DateTime<Utc>,
    pub message: Value,
}

/// Creates `queue_name` if it does not already exist. Safe to call on
/// every `connect()`.
pub async fn create_queue(gateway: &dyn Gateway, queue_name: &str) -> Result<(), GatewayError> {
    let result = sqlx::query("SELECT pgmq.create($1)")
        .bind(queue_name)
        .execute(gateway.pool())
        .await;
    match result {
        Ok(_) => Ok(()),
        Err(err) if is_already_exists(&err) => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Enqueues `message` and returns the assigned `msg_id`.
pub async fn send(gateway: &dyn Gateway, queue_name: &str, message: &Value) -> Result<i64, GatewayError> {
    let (msg_id,): (i64,) = sqlx::query_as("SELECT * FROM pgmq.send($1, $2)")
        .bind(queue_name)
        .bind(message)
        .fetch_one(gateway.pool())
        .await?;
    Ok(msg_id)
}

/// Reads up to `qty` messages, hiding each for `visibility_timeout_seconds`
/// before it becomes visible to another reader again.
pub async fn read(
    gateway: &dyn Gateway,
    queue_name: &str,
    visibility_timeout_seconds: i32,
    qty: i32,
) -> Result<Vec<QueueMessage>, GatewayError> {
    let rows: Vec<QueueMessage> = sqlx::query_as(
        "SELECT msg_id, read_ct, enqueued_at, vt, message FROM pgmq.read($1, $2, $3)",
    )
    .bind(queue_name)
    .bind(visibility_timeout_seconds)
    .bind(qty)
    .fetch_all(gateway.pool())
    .await?;
    Ok(rows)
}

/// Permanently removes `msg_id` from `queue_name`. Called after a message
/// has been fully dispatched (or moved to the DLQ).
pub async fn delete(gateway: &dyn Gateway, queue_name: &str, msg_id: i64) -> Result<bool, GatewayError> {
    let (deleted,): (bool,) = sqlx::query_as("SELECT pgmq.delete($1, $2)")
        .bind(queue_name)
        .bind(msg_id)
        .fetch_one(gateway.pool())
        .await?;
    Ok(deleted)
}
