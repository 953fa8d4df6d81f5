use corebus_data_sqlx::GatewayError;

/// Failures from `schedule_task`/`unschedule_task` (§4.8).
#[derive(Debug)]
pub enum SchedulerError {
    Gateway(GatewayError),
    /// `cron.schedule` returned a null job id — treated as fatal rather
    /// than silently leaving a task row with no backing cron job.
    NullJobId { task_name: String },
    TaskNotFound { task_id: uuid::Uuid },
    /// `cron_expression` failed to parse against the standard five-field
    /// crontab grammar `pg_cron` expects. Caught client-side before ever
    /// reaching `cron.schedule`, so a typo surfaces as a typed error
    /// instead of an opaque Postgres failure.
    InvalidCronExpression { expression: String, reason: String },
}

impl std::fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerError::Gateway(e) => write!(f, "{e}"),
            SchedulerError::NullJobId { task_name } => {
                write!(f, "cron.schedule returned a null job id for task '{task_name}'")
            }
            SchedulerError::TaskNotFound { task_id } => write!(f, "scheduled task '{task_id}' not found"),
            SchedulerError::InvalidCronExpression { expression, reason } => {
                write!(f, "invalid cron expression '{expression}': {reason}")
            }
        }
    }
}

impl std::error::Error for SchedulerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SchedulerError::Gateway(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GatewayError> for SchedulerError {
    fn from(err: GatewayError) -> Self {
        SchedulerError::Gateway(err)
    }
}
