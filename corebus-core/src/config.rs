//! Connection and runtime options recognized by `CoreSystem::connect`.
//!
//! This is the typed form of the configuration table in the design docs.
//! It does not attempt to be a general environment/file config loader —
//! that belongs to the admission façade — but it does provide a thin
//! `from_env` convenience constructor, since reading a DSN out of the
//! environment is the first thing every example in this workspace does.

use crate::ident::sanitize;
use crate::logger::{default_logger, Logger};
use std::sync::Arc;
use uuid::Uuid;

/// Default idle-poll interval, in milliseconds, used when the registry or
/// the queue read comes back empty.
pub const DEFAULT_IDLE_POLL_INTERVAL_MS: u64 = 1_000;
/// Default queue read visibility timeout, in seconds.
pub const DEFAULT_VISIBILITY_TIMEOUT_SECONDS: u64 = 30;
/// Default max messages per queue read.
pub const DEFAULT_BATCH_SIZE: i32 = 10;
/// Heartbeat ticker period, in seconds.
pub const HEARTBEAT_INTERVAL_SECONDS: u64 = 30;

/// Options accepted by `CoreSystem::connect`.
#[derive(Clone)]
pub struct ConnectOptions {
    pub connection_string: String,
    /// Raw namespace as supplied by the caller; use [`ConnectOptions::namespace`]
    /// to get the sanitized form used for queue/schema naming.
    namespace_raw: String,
    pub application: Option<String>,
    pub idle_poll_interval_ms: u64,
    pub visibility_timeout_seconds: u64,
    pub batch_size: i32,
    pub enable_workers: bool,
    pub worker_api_endpoint: Option<String>,
    pub worker_id: String,
    pub auto_detect_workers: bool,
    pub logger: Arc<dyn Logger>,
}

impl ConnectOptions {
    pub fn new(connection_string: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            namespace_raw: namespace.into(),
            application: None,
            idle_poll_interval_ms: DEFAULT_IDLE_POLL_INTERVAL_MS,
            visibility_timeout_seconds: DEFAULT_VISIBILITY_TIMEOUT_SECONDS,
            batch_size: DEFAULT_BATCH_SIZE,
            enable_workers: false,
            worker_api_endpoint: None,
            worker_id: format!("worker-{}", Uuid::new_v4()),
            auto_detect_workers: false,
            logger: default_logger(),
        }
    }

    /// Read `connection_string` from `DATABASE_URL` and `namespace` from
    /// `COREBUS_NAMESPACE` (loading a `.env` file first, if present).
    ///
    /// This is a thin convenience, not a config loader: callers who need
    /// validation, layered sources, or secrets management should build
    /// their own `ConnectOptions` and hand it to `connect()` directly.
    pub fn from_env() -> Result<Self, std::env::VarError> {
        let _ = dotenvy::dotenv();
        let connection_string = std::env::var("DATABASE_URL")?;
        let namespace = std::env::var("COREBUS_NAMESPACE")?;
        Ok(Self::new(connection_string, namespace))
    }

    pub fn namespace(&self) -> String {
        sanitize(&self.namespace_raw)
    }

    pub fn with_application(mut self, application: impl Into<String>) -> Self {
        self.application = Some(application.into());
        self
    }

    pub fn with_idle_poll_interval_ms(mut self, ms: u64) -> Self {
        self.idle_poll_interval_ms = ms;
        self
    }

    pub fn with_visibility_timeout_seconds(mut self, seconds: u64) -> Self {
        self.visibility_timeout_seconds = seconds;
        self
    }

    pub fn with_batch_size(mut self, size: i32) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_enable_workers(mut self, enable: bool) -> Self {
        self.enable_workers = enable;
        self
    }

    pub fn with_worker_api_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.worker_api_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_worker_id(mut self, worker_id: impl Into<String>) -> Self {
        self.worker_id = worker_id.into();
        self
    }

    pub fn with_auto_detect_workers(mut self, auto_detect: bool) -> Self {
        self.auto_detect_workers = auto_detect;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Enhanced mode requires a non-empty endpoint, either because
    /// `enable_workers` was forced on or because auto-detection will probe
    /// `worker_api_endpoint` for a live router.
    pub fn wants_enhanced_mode(&self) -> bool {
        let has_endpoint = self
            .worker_api_endpoint
            .as_ref()
            .is_some_and(|e| !e.is_empty());
        has_endpoint && (self.enable_workers || self.auto_detect_workers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_is_sanitized() {
        let opts = ConnectOptions::new("postgres://x", "dev-one");
        assert_eq!(opts.namespace(), "dev_one");
    }

    #[test]
    fn wants_enhanced_mode_requires_endpoint() {
        let opts = ConnectOptions::new("postgres://x", "demo").with_enable_workers(true);
        assert!(!opts.wants_enhanced_mode());

        let opts = opts.with_worker_api_endpoint("http://router:8080");
        assert!(opts.wants_enhanced_mode());
    }

    #[test]
    fn standalone_by_default() {
        let opts = ConnectOptions::new("postgres://x", "demo");
        assert!(!opts.wants_enhanced_mode());
    }

    #[test]
    fn auto_detect_alone_also_requires_endpoint() {
        let opts = ConnectOptions::new("postgres://x", "demo").with_auto_detect_workers(true);
        assert!(!opts.wants_enhanced_mode());
        let opts = opts.with_worker_api_endpoint("http://router:8080");
        assert!(opts.wants_enhanced_mode());
    }
}
