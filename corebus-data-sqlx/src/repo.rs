//! Typed wrappers around the stored routines and tables in [`crate::sql`].
//!
//! These functions do not enforce any cross-cutting policy (e.g. the
//! cross-namespace node-id collision rejection) — that belongs to the node
//! lifecycle code in `corebus-events`, which calls
//! [`find_node_namespace`] before [`upsert_node`] to decide whether to
//! reject the registration. Keeping the policy out of this crate keeps the
//! data layer a plain mirror of the schema, the same split the teacher
//! draws between its repository layer and its service layer.

use crate::error::GatewayError;
use crate::gateway::Gateway;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct ScheduledTaskRow {
    pub task_id: Uuid,
    pub namespace: String,
    pub job_id: i64,
    pub name: String,
    pub cron_expression: String,
    pub event_type: String,
    pub payload: Value,
    pub timezone: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Returns the namespace `node_id` is currently registered under, if any.
pub async fn find_node_namespace(gateway: &dyn Gateway, node_id: &str) -> Result<Option<String>, GatewayError> {
    let row: Option<(String,)> = sqlx::query_as("SELECT namespace FROM core.nodes WHERE node_id = $1")
        .bind(node_id)
        .fetch_optional(gateway.pool())
        .await?;
    Ok(row.map(|(ns,)| ns))
}

/// Registers `node_id`, or refreshes its display name, description,
/// metadata and heartbeat if it is already registered — the exact upsert
/// named in §4.6. Callers must have already confirmed there is no
/// cross-namespace collision, since the conflict target here is `node_id`
/// alone.
pub async fn upsert_node(
    gateway: &dyn Gateway,
    namespace: &str,
    node_id: &str,
    display_name: Option<&str>,
    description: Option<&str>,
    metadata: &Value,
) -> Result<(), GatewayError> {
    sqlx::query(
        r#"
        INSERT INTO core.nodes (namespace, node_id, display_name, description, metadata, registered_at, last_heartbeat)
        VALUES ($1, $2, $3, $4, $5, now(), now())
        ON CONFLICT (node_id) DO UPDATE SET
            display_name = excluded.display_name,
            description = excluded.description,
            metadata = excluded.metadata,
            last_heartbeat = now()
        "#,
    )
    .bind(namespace)
    .bind(node_id)
    .bind(display_name)
    .bind(description)
    .bind(metadata)
    .execute(gateway.pool())
    .await?;
    Ok(())
}

/// Refreshes `node_id`'s `last_heartbeat`. Called every
/// [`corebus_core::config::HEARTBEAT_INTERVAL_SECONDS`] by the node's
/// heartbeat ticker.
pub async fn touch_heartbeat(gateway: &dyn Gateway, node_id: &str) -> Result<(), GatewayError> {
    sqlx::query("SELECT core.touch_node_heartbeat($1)")
        .bind(node_id)
        .execute(gateway.pool())
        .await?;
    Ok(())
}

/// Removes a node's row entirely, used on graceful shutdown so a dead
/// node doesn't linger in liveness queries.
pub async fn remove_node(gateway: &dyn Gateway, node_id: &str) -> Result<(), GatewayError> {
    sqlx::query("DELETE FROM core.nodes WHERE node_id = $1")
        .bind(node_id)
        .execute(gateway.pool())
        .await?;
    Ok(())
}

/// Inserts a scheduled task row. The pg_cron `job_id` must already have
/// been created by the caller (`corebus-scheduler`) since `core.scheduled_tasks`
/// references it but does not create it.
#[allow(clippy::too_many_arguments)]
pub async fn insert_scheduled_task(
    gateway: &dyn Gateway,
    task_id: Uuid,
    namespace: &str,
    job_id: i64,
    name: &str,
    cron_expression: &str,
    event_type: &str,
    payload: &Value,
    timezone: Option<&str>,
) -> Result<ScheduledTaskRow, GatewayError> {
    let row = sqlx::query_as::<_, ScheduledTaskRow>(
        r#"
        INSERT INTO core.scheduled_tasks
            (task_id, namespace, job_id, name, cron_expression, event_type, payload, timezone)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING task_id, namespace, job_id, name, cron_expression, event_type, payload, timezone, active, created_at, updated_at
        "#,
    )
    .bind(task_id)
    .bind(namespace)
    .bind(job_id)
    .bind(name)
    .bind(cron_expression)
    .bind(event_type)
    .bind(payload)
    .bind(timezone)
    .fetch_one(gateway.pool())
    .await?;
    Ok(row)
}

pub async fn find_scheduled_task(gateway: &dyn Gateway, task_id: Uuid) -> Result<Option<ScheduledTaskRow>, GatewayError> {
    let row = sqlx::query_as::<_, ScheduledTaskRow>("SELECT * FROM core.scheduled_tasks WHERE task_id = $1")
        .bind(task_id)
        .fetch_optional(gateway.pool())
        .await?;
    Ok(row)
}

/// Appends one row to the durable event log and returns its `event_id`.
/// `metadata` is where a `messageId`/`redeliveryCount` would be folded in
/// by the caller before appending, per §3.1's essential-attributes note —
/// there is no dedicated `message_id` column.
pub async fn append_event_log(
    gateway: &dyn Gateway,
    namespace: &str,
    event_type: &str,
    payload: &Value,
    producer_node_id: &str,
    scheduled_task_id: Option<Uuid>,
    metadata: &Value,
) -> Result<i64, GatewayError> {
    let (event_id,): (i64,) = sqlx::query_as("SELECT core.append_event_log($1, $2, $3, $4, $5, $6)")
        .bind(namespace)
        .bind(event_type)
        .bind(payload)
        .bind(producer_node_id)
        .bind(scheduled_task_id)
        .bind(metadata)
        .fetch_one(gateway.pool())
        .await?;
    Ok(event_id)
}
