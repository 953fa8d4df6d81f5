//! # corebus-scheduler — cron-triggered event scheduling (§4.8)
//!
//! A thin facade over two things Postgres already does: `pg_cron`'s
//! `cron.schedule`/`cron.unschedule` and the `core.scheduled_tasks` table.
//! No in-process ticking is involved — the cron job fires inside Postgres
//! itself and calls `core.run_scheduled_task(task_id)`, which is how the
//! actual enqueue happens (see `corebus-data-sqlx::sql::RUN_SCHEDULED_TASK_FN`).

pub mod error;

pub use error::SchedulerError;

use corebus_core::sanitize;
use corebus_data_sqlx::{repo, repo::ScheduledTaskRow, with_transaction, Gateway};
use serde_json::Value;
use std::str::FromStr;
use uuid::Uuid;

/// Validates `expr` against the five-field crontab grammar `pg_cron`
/// expects. The `cron` crate's `Schedule` parser wants a leading seconds
/// field, so a plain five-field expression is tried with `"0 "` prefixed
/// before giving up — this keeps `"* * * * *"`-style expressions (the
/// form used throughout this workspace and in pg_cron's own docs) valid
/// without accepting garbage.
fn validate_cron_expression(expr: &str) -> Result<(), SchedulerError> {
    if cron::Schedule::from_str(expr).is_ok() {
        return Ok(());
    }
    let with_seconds = format!("0 {expr}");
    match cron::Schedule::from_str(&with_seconds) {
        Ok(_) => Ok(()),
        Err(err) => Err(SchedulerError::InvalidCronExpression { expression: expr.to_string(), reason: err.to_string() }),
    }
}

pub struct Scheduler {
    gateway: std::sync::Arc<dyn Gateway>,
}

impl Scheduler {
    pub fn new(gateway: std::sync::Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// Creates the `pg_cron` job and the `core.scheduled_tasks` row
    /// together. A null job id from `cron.schedule` is fatal — §7 "null job
    /// id is a fatal error" — since a task row with no backing job would
    /// silently never fire.
    #[allow(clippy::too_many_arguments)]
    pub async fn schedule_task(
        &self,
        namespace: &str,
        name: &str,
        cron_expression: &str,
        event_type: &str,
        payload: &Value,
        timezone: Option<&str>,
    ) -> Result<ScheduledTaskRow, SchedulerError> {
        validate_cron_expression(cron_expression)?;

        let task_id = Uuid::new_v4();
        let job_name = format!("{namespace}_{}_{task_id}", sanitize(name));
        let command = format!("SELECT core.run_scheduled_task('{task_id}')");

        let job_id: Option<i64> = sqlx::query_scalar("SELECT cron.schedule($1, $2, $3)")
            .bind(&job_name)
            .bind(cron_expression)
            .bind(&command)
            .fetch_one(self.gateway.pool())
            .await
            .map_err(corebus_data_sqlx::GatewayError::from)?;

        let job_id = job_id.ok_or_else(|| SchedulerError::NullJobId { task_name: name.to_string() })?;

        tracing::info!(namespace, name, job_id, "scheduled cron task");

        let row = repo::insert_scheduled_task(
            self.gateway.as_ref(),
            task_id,
            namespace,
            job_id,
            name,
            cron_expression,
            event_type,
            payload,
            timezone,
        )
        .await?;
        Ok(row)
    }

    /// Deactivates `task_id` and unschedules its `pg_cron` job under one
    /// transaction. An already-gone job is tolerated and logged at `warn`
    /// rather than treated as fatal (§9's "already-gone external state is
    /// non-fatal" policy, applied here to the companion unschedule op).
    pub async fn unschedule_task(&self, task_id: Uuid) -> Result<(), SchedulerError> {
        let task = repo::find_scheduled_task(self.gateway.as_ref(), task_id)
            .await?
            .ok_or(SchedulerError::TaskNotFound { task_id })?;

        with_transaction(self.gateway.as_ref(), |tx: &mut sqlx::Transaction<'static, sqlx::Postgres>| async move {
            sqlx::query("UPDATE core.scheduled_tasks SET active = false, updated_at = now() WHERE task_id = $1")
                .bind(task_id)
                .execute(&mut *tx)
                .await
                .map_err(corebus_data_sqlx::GatewayError::from)?;

            let unscheduled: Option<bool> = sqlx::query_scalar("SELECT cron.unschedule($1)")
                .bind(task.job_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(corebus_data_sqlx::GatewayError::from)?;

            if unscheduled != Some(true) {
                tracing::warn!(task_id = %task_id, job_id = task.job_id, "cron job already gone, treating unschedule as a no-op");
            }

            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_field_wildcard_expression_is_valid() {
        assert!(validate_cron_expression("* * * * *").is_ok());
    }

    #[test]
    fn daily_at_midnight_is_valid() {
        assert!(validate_cron_expression("0 0 * * *").is_ok());
    }

    #[test]
    fn garbage_expression_is_rejected() {
        let err = validate_cron_expression("not a cron expression").unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidCronExpression { .. }));
    }

    #[test]
    fn too_few_fields_is_rejected() {
        assert!(validate_cron_expression("* *").is_err());
    }
}
