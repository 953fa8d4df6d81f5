//! [`NodeHandle`] — the public handle application code holds, combining
//! `corebus-events::Node` (handler registration, heartbeat, emit) with
//! `corebus-scheduler::Scheduler` (`schedule_task`, §4.8) and the
//! enhanced-mode router's best-effort subscribe notification (§4.6).
//!
//! Kept as a thin wrapper in this facade crate rather than folded into
//! `corebus-events::Node` so that crate can stay free of a
//! `corebus-scheduler`/`corebus-router` dependency — the same
//! leaves-first layering the rest of the workspace follows.

use corebus_core::{Logger, LoggerExt, MessageId};
use corebus_events::{EmitError, Handler, HandlerId, Node};
use corebus_router::RouterClient;
use corebus_scheduler::{Scheduler, SchedulerError};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// A registered process participant, scoped to one namespace.
pub struct NodeHandle {
    inner: Arc<Node>,
    scheduler: Arc<Scheduler>,
    router_client: Option<Arc<RouterClient>>,
    worker_id: String,
    logger: Arc<dyn Logger>,
}

impl NodeHandle {
    pub(crate) fn new(
        inner: Arc<Node>,
        scheduler: Arc<Scheduler>,
        router_client: Option<Arc<RouterClient>>,
        worker_id: String,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self { inner, scheduler, router_client, worker_id, logger }
    }

    pub fn node_id(&self) -> &str {
        self.inner.node_id()
    }

    pub fn namespace(&self) -> &str {
        self.inner.namespace()
    }

    /// Idempotent; starts the 30-second heartbeat ticker.
    pub fn start(&self) {
        self.inner.start();
    }

    /// Idempotent; stops the heartbeat ticker. Registered handlers persist
    /// until explicitly unregistered or `close()`d (§3.3, §4.6).
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Terminal teardown: stops the heartbeat, drops every handler this
    /// node owns, and removes its row (§4.9 `Stopped --close--> Closed`).
    pub async fn close(&self) {
        self.inner.close().await;
    }

    /// Registers `handler` for `event_type`. In enhanced mode, also
    /// notifies the router of the subscription — best-effort, spawned
    /// off so a slow/unreachable router never blocks registration
    /// (§4.6 "best-effort; failure is logged, not propagated").
    pub async fn on_event(&self, event_type: &str, handler: Arc<dyn Handler>) -> HandlerId {
        let handler_id = self.inner.on_event(event_type, handler).await;
        if let Some(router) = self.router_client.clone() {
            let event_type = event_type.to_string();
            let worker_id = self.worker_id.clone();
            let logger = self.logger.clone();
            tokio::spawn(async move {
                if let Err(err) = router.subscribe(&worker_id, std::slice::from_ref(&event_type)).await {
                    logger.warn(format!("router subscribe failed for '{event_type}': {err}"));
                }
            });
        }
        handler_id
    }

    /// Unregisters a handler previously returned by `on_event`. In
    /// enhanced mode, also notifies the router — best-effort, same as
    /// `on_event`.
    pub async fn off_event(&self, event_type: &str, handler_id: HandlerId) {
        self.inner.off_event(event_type, handler_id).await;
        if let Some(router) = self.router_client.clone() {
            let event_type = event_type.to_string();
            let worker_id = self.worker_id.clone();
            let logger = self.logger.clone();
            tokio::spawn(async move {
                if let Err(err) = router.unsubscribe(&worker_id, std::slice::from_ref(&event_type)).await {
                    logger.warn(format!("router unsubscribe failed for '{event_type}': {err}"));
                }
            });
        }
    }

    pub async fn emit(&self, event_type: &str, payload: Value) -> Result<MessageId, EmitError> {
        self.inner.emit(event_type, payload).await
    }

    /// Fans `payload` out to every handler in the process, ignoring
    /// `event_type` routing entirely (§9 "Broadcast dispatch").
    pub async fn emit_broadcast(&self, event_type: &str, payload: Value) -> Result<MessageId, EmitError> {
        self.inner.emit_broadcast(event_type, payload).await
    }

    /// Creates a cron-triggered task (§4.8). Firing itself happens inside
    /// Postgres via `core.run_scheduled_task`, not this node's process.
    #[allow(clippy::too_many_arguments)]
    pub async fn schedule_task(
        &self,
        name: &str,
        cron_expression: &str,
        event_type: &str,
        payload: &Value,
        timezone: Option<&str>,
    ) -> Result<corebus_data_sqlx::repo::ScheduledTaskRow, SchedulerError> {
        self.scheduler
            .schedule_task(self.inner.namespace(), name, cron_expression, event_type, payload, timezone)
            .await
    }

    /// Deactivates a scheduled task and unschedules its `pg_cron` job
    /// (§9's promoted `unschedule_task` companion operation).
    pub async fn unschedule_task(&self, task_id: Uuid) -> Result<(), SchedulerError> {
        self.scheduler.unschedule_task(task_id).await
    }
}

/// Re-exported so application code implementing handlers doesn't need a
/// direct `corebus-core` dependency just for the envelope type.
pub use corebus_core::EventEnvelope as Envelope;
