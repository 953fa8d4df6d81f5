//! Five-phase, idempotent schema initializer run once per `connect()`.
//!
//! 1. enable extensions
//! 2. create schema, tables, indexes, stored routines
//! 3. register the namespace row
//! 4. create the namespace's queue and dead-letter queue
//! 5. register the event log with `pg_partman`
//!
//! Every phase tolerates "already exists" so that two processes racing to
//! connect to the same fresh namespace don't fail each other.

use crate::error::{is_already_exists, GatewayError, InitError};
use crate::gateway::Gateway;
use crate::{queue, sql};
use chrono::{Datelike, Months, NaiveDate, Utc};
use corebus_core::{dlq_name, queue_name};

async fn run_tolerantly(gateway: &dyn Gateway, phase: &'static str, sql: &str) -> Result<(), InitError> {
    match gateway.execute(sql).await {
        Ok(()) => Ok(()),
        Err(GatewayError::Query(err)) if is_already_exists(&err) => Ok(()),
        Err(err) => Err(InitError::new(phase, err)),
    }
}

/// Runs every phase against a fresh connection for `namespace`. Returns as
/// soon as a phase fails fatally; extension and partman failures are the
/// most common cause, since they require superuser/role grants the
/// connecting user may not have in a locked-down deployment.
pub async fn initialize(gateway: &dyn Gateway, namespace: &str) -> Result<(), InitError> {
    enable_extensions(gateway).await?;
    create_schema(gateway).await?;
    register_namespace(gateway, namespace).await?;
    create_queues(gateway, namespace).await?;
    configure_partitioning(gateway).await?;
    Ok(())
}

async fn enable_extensions(gateway: &dyn Gateway) -> Result<(), InitError> {
    for stmt in sql::ENABLE_EXTENSIONS {
        run_tolerantly(gateway, "enable_extensions", stmt).await?;
    }
    Ok(())
}

async fn create_schema(gateway: &dyn Gateway) -> Result<(), InitError> {
    run_tolerantly(gateway, "create_schema", sql::CREATE_SCHEMA).await?;
    run_tolerantly(gateway, "create_schema", sql::CREATE_NAMESPACES_TABLE).await?;
    run_tolerantly(gateway, "create_schema", sql::CREATE_NODES_TABLE).await?;
    run_tolerantly(gateway, "create_schema", sql::CREATE_SCHEDULED_TASKS_TABLE).await?;
    run_tolerantly(gateway, "create_schema", sql::CREATE_EVENT_LOG_TABLE).await?;
    run_tolerantly(gateway, "create_schema", sql::CREATE_EVENT_LOG_DEFAULT_PARTITION).await?;
    run_tolerantly(gateway, "create_schema", sql::CREATE_EVENT_LOG_NAMESPACE_INDEX).await?;
    run_tolerantly(gateway, "create_schema", sql::CREATE_EVENT_LOG_TYPE_INDEX).await?;
    run_tolerantly(gateway, "create_schema", sql::TOUCH_NODE_HEARTBEAT_FN).await?;
    run_tolerantly(gateway, "create_schema", sql::APPEND_EVENT_LOG_FN).await?;
    run_tolerantly(gateway, "create_schema", sql::QUEUE_NAME_FOR_NAMESPACE_FN).await?;
    run_tolerantly(gateway, "create_schema", sql::DEAD_LETTER_QUEUE_NAME_FOR_NAMESPACE_FN).await?;
    run_tolerantly(gateway, "create_schema", sql::RUN_SCHEDULED_TASK_FN).await?;
    Ok(())
}

async fn register_namespace(gateway: &dyn Gateway, namespace: &str) -> Result<(), InitError> {
    let result = sqlx::query("INSERT INTO core.namespaces (namespace) VALUES ($1) ON CONFLICT DO NOTHING")
        .bind(namespace)
        .execute(gateway.pool())
        .await;
    result
        .map(|_| ())
        .map_err(|err| InitError::new("register_namespace", GatewayError::from(err)))
}

async fn create_queues(gateway: &dyn Gateway, namespace: &str) -> Result<(), InitError> {
    queue::create_queue(gateway, &queue_name(namespace))
        .await
        .map_err(|err| InitError::new("create_queues", err))?;
    queue::create_queue(gateway, &dlq_name(namespace))
        .await
        .map_err(|err| InitError::new("create_queues", err))?;
    Ok(())
}

/// Registers monthly partitioning and a six-month retention window with
/// `pg_partman`. If the extension itself could not be created (denied
/// grants, or genuinely unavailable on this instance), falls back to
/// manually creating partitions for the current month and the next six,
/// per §4.3 phase 5.
async fn configure_partitioning(gateway: &dyn Gateway) -> Result<(), InitError> {
    match gateway.execute(sql::CONFIGURE_PARTMAN).await {
        Ok(()) => {
            run_tolerantly(gateway, "configure_partitioning", sql::CONFIGURE_PARTMAN_RETENTION).await
        }
        Err(GatewayError::Query(err)) if is_already_exists(&err) => {
            run_tolerantly(gateway, "configure_partitioning", sql::CONFIGURE_PARTMAN_RETENTION).await
        }
        Err(_) => create_manual_partitions(gateway).await,
    }
}

/// Creates `core.event_log_yYYYYmMM` range partitions for this month and
/// the next six, tolerating "already exists" on each.
async fn create_manual_partitions(gateway: &dyn Gateway) -> Result<(), InitError> {
    let today = Utc::now().date_naive();
    let start_of_month = NaiveDate::from_ymd_opt(today.year(), today.month(), 1)
        .expect("first of a valid month is always a valid date");

    for offset in 0..7u32 {
        let from = start_of_month
            .checked_add_months(Months::new(offset))
            .expect("partition month offset stays within chrono's supported range");
        let to = from
            .checked_add_months(Months::new(1))
            .expect("partition month offset stays within chrono's supported range");
        let partition_name = format!("core.event_log_y{:04}m{:02}", from.year(), from.month());
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {partition_name} PARTITION OF core.event_log FOR VALUES FROM ('{from}') TO ('{to}')"
        );
        run_tolerantly(gateway, "configure_partitioning", &sql).await?;
    }
    Ok(())
}
