//! Embedded DDL for the `core` schema and its stored routines.
//!
//! These are applied by [`crate::init`] in order, each statement wrapped
//! with `IF NOT EXISTS` where Postgres supports it and with
//! [`crate::error::is_already_exists`] tolerance where it doesn't (stored
//! routines use `CREATE OR REPLACE`, which is always idempotent, so that
//! tolerance is only needed for the extensions and the partition creator).

pub const ENABLE_EXTENSIONS: &[&str] = &[
    "CREATE EXTENSION IF NOT EXISTS pgmq",
    "CREATE EXTENSION IF NOT EXISTS pg_cron",
    "CREATE EXTENSION IF NOT EXISTS pg_partman",
    "CREATE EXTENSION IF NOT EXISTS pg_stat_statements",
];

pub const CREATE_SCHEMA: &str = "CREATE SCHEMA IF NOT EXISTS core";

pub const CREATE_NAMESPACES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS core.namespaces (
    namespace   text PRIMARY KEY,
    created_at  timestamptz NOT NULL DEFAULT now(),
    metadata    jsonb NOT NULL DEFAULT '{}'::jsonb
)
"#;

pub const CREATE_NODES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS core.nodes (
    id              bigint GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
    namespace       text NOT NULL REFERENCES core.namespaces(namespace),
    node_id         text NOT NULL UNIQUE,
    display_name    text,
    description     text,
    metadata        jsonb NOT NULL DEFAULT '{}'::jsonb,
    registered_at   timestamptz NOT NULL DEFAULT now(),
    last_heartbeat  timestamptz NOT NULL DEFAULT now(),
    UNIQUE (namespace, node_id)
)
"#;

pub const CREATE_SCHEDULED_TASKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS core.scheduled_tasks (
    task_id         uuid PRIMARY KEY DEFAULT gen_random_uuid(),
    namespace       text NOT NULL REFERENCES core.namespaces(namespace),
    job_id          bigint NOT NULL,
    name            text NOT NULL,
    cron_expression text NOT NULL,
    event_type      text NOT NULL,
    payload         jsonb NOT NULL DEFAULT '{}'::jsonb,
    timezone        text,
    active          boolean NOT NULL DEFAULT true,
    created_at      timestamptz NOT NULL DEFAULT now(),
    updated_at      timestamptz NOT NULL DEFAULT now()
)
"#;

/// `metadata` holds `messageId` and `redeliveryCount` (§3.1) rather than
/// dedicated columns — both are properties of a delivery attempt, not of
/// the logged fact of emission, and the routine that appends this row
/// often has neither on hand (the scheduler routine logs before a
/// `messageId` has even been assigned to a reader).
pub const CREATE_EVENT_LOG_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS core.event_log (
    event_id            bigint GENERATED ALWAYS AS IDENTITY,
    namespace           text NOT NULL,
    event_type          text NOT NULL,
    payload             jsonb NOT NULL DEFAULT '{}'::jsonb,
    producer_node_id    text NOT NULL,
    scheduled_task_id   uuid,
    metadata            jsonb NOT NULL DEFAULT '{}'::jsonb,
    emitted_at          timestamptz NOT NULL DEFAULT now(),
    PRIMARY KEY (event_id, emitted_at)
) PARTITION BY RANGE (emitted_at)
"#;

pub const CREATE_EVENT_LOG_DEFAULT_PARTITION: &str =
    "CREATE TABLE IF NOT EXISTS core.event_log_default PARTITION OF core.event_log DEFAULT";

pub const CREATE_EVENT_LOG_NAMESPACE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS event_log_namespace_idx ON core.event_log (namespace, emitted_at DESC)";

pub const CREATE_EVENT_LOG_TYPE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS event_log_event_type_idx ON core.event_log (event_type, emitted_at DESC)";

/// Registers `core.event_log` with `pg_partman` for monthly partitioning,
/// six premade partitions ahead of the current month and a six-month
/// retention window (§4.3 phase 5).
pub const CONFIGURE_PARTMAN: &str = r#"
SELECT partman.create_parent(
    p_parent_table := 'core.event_log',
    p_control := 'emitted_at',
    p_interval := 'monthly',
    p_premake := 6
)
"#;

pub const CONFIGURE_PARTMAN_RETENTION: &str = r#"
UPDATE partman.part_config
SET retention = '6 months', retention_keep_table = false
WHERE parent_table = 'core.event_log'
"#;

pub const TOUCH_NODE_HEARTBEAT_FN: &str = r#"
CREATE OR REPLACE FUNCTION core.touch_node_heartbeat(p_node_id text)
RETURNS void AS $$
BEGIN
    UPDATE core.nodes SET last_heartbeat = now() WHERE node_id = p_node_id;
END;
$$ LANGUAGE plpgsql
"#;

pub const APPEND_EVENT_LOG_FN: &str = r#"
CREATE OR REPLACE FUNCTION core.append_event_log(
    p_namespace text,
    p_event_type text,
    p_payload jsonb,
    p_producer_node_id text,
    p_scheduled_task_id uuid DEFAULT NULL,
    p_metadata jsonb DEFAULT '{}'::jsonb
) RETURNS bigint AS $$
DECLARE
    new_id bigint;
BEGIN
    INSERT INTO core.event_log (
        namespace, event_type, payload, producer_node_id,
        scheduled_task_id, metadata
    ) VALUES (
        p_namespace, p_event_type, p_payload, p_producer_node_id,
        p_scheduled_task_id, COALESCE(p_metadata, '{}'::jsonb)
    )
    RETURNING event_id INTO new_id;
    RETURN new_id;
END;
$$ LANGUAGE plpgsql
"#;

pub const QUEUE_NAME_FOR_NAMESPACE_FN: &str = r#"
CREATE OR REPLACE FUNCTION core.queue_name_for_namespace(p_namespace text)
RETURNS text AS $$
    SELECT 'core_events_' || replace(p_namespace, '-', '_');
$$ LANGUAGE sql IMMUTABLE
"#;

pub const DEAD_LETTER_QUEUE_NAME_FOR_NAMESPACE_FN: &str = r#"
CREATE OR REPLACE FUNCTION core.dead_letter_queue_name_for_namespace(p_namespace text)
RETURNS text AS $$
    SELECT core.queue_name_for_namespace(p_namespace) || '_dlq';
$$ LANGUAGE sql IMMUTABLE
"#;

/// Executed by the `pg_cron` job created for a scheduled task. Loads the
/// task row, bails out quietly if it has since been deactivated or deleted
/// (a task can be unscheduled between the cron job firing and this routine
/// running), and otherwise emits the event through `pgmq.send` followed by
/// a `core.append_event_log` call with `metadata = {jobId}`, matching
/// §6.1 exactly.
pub const RUN_SCHEDULED_TASK_FN: &str = r#"
CREATE OR REPLACE FUNCTION core.run_scheduled_task(p_task_id uuid)
RETURNS void AS $$
DECLARE
    task        core.scheduled_tasks%ROWTYPE;
    queue_name  text;
    envelope    jsonb;
BEGIN
    SELECT * INTO task FROM core.scheduled_tasks WHERE task_id = p_task_id;

    IF NOT FOUND OR NOT task.active THEN
        RAISE NOTICE 'scheduled task % missing or inactive, skipping', p_task_id;
        RETURN;
    END IF;

    queue_name := core.queue_name_for_namespace(task.namespace);

    envelope := jsonb_build_object(
        'namespace', task.namespace,
        'eventType', task.event_type,
        'payload', task.payload,
        'emittedAt', to_char(now() AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS.MS"Z"'),
        'producerNodeId', 'scheduler',
        'scheduledTaskId', task.task_id
    );

    PERFORM pgmq.send(queue_name, envelope);

    PERFORM core.append_event_log(
        task.namespace, task.event_type, task.payload, 'scheduler',
        task.task_id, jsonb_build_object('jobId', task.job_id)
    );

    UPDATE core.scheduled_tasks SET updated_at = now() WHERE task_id = p_task_id;
END;
$$ LANGUAGE plpgsql
"#;
