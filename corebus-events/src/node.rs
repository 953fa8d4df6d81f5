//! Node lifecycle (§4.6): registration, heartbeat, and the handle
//! application code actually calls `on_event`/`emit`/`schedule_task` on.

use crate::emit::{self, EventRouter};
use crate::error::{EmitError, NodeError};
use crate::handler::{Handler, HandlerId};
use crate::registry::HandlerRegistry;
use corebus_core::config::HEARTBEAT_INTERVAL_SECONDS;
use corebus_core::{Logger, LoggerExt, MessageId};
use corebus_data_sqlx::{repo, Gateway};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// A registered process participant. Owns nothing the consumer doesn't
/// also share (the gateway and registry are both `Arc`-shared), but is
/// the handle application code holds: `on_event`, `emit`, lifecycle.
pub struct Node {
    gateway: Arc<dyn Gateway>,
    registry: HandlerRegistry,
    router: Option<Arc<dyn EventRouter>>,
    namespace: String,
    node_id: String,
    logger: Arc<dyn Logger>,
    heartbeat_running: Arc<AtomicBool>,
}

impl Node {
    /// Registers `node_id` under `namespace`, rejecting a cross-namespace
    /// collision before ever issuing the upsert (§4.6, §9 open question 2).
    #[allow(clippy::too_many_arguments)]
    pub async fn register(
        gateway: Arc<dyn Gateway>,
        registry: HandlerRegistry,
        router: Option<Arc<dyn EventRouter>>,
        namespace: &str,
        node_id: &str,
        display_name: Option<&str>,
        description: Option<&str>,
        metadata: Value,
        logger: Arc<dyn Logger>,
    ) -> Result<Self, NodeError> {
        if let Some(existing_namespace) = repo::find_node_namespace(gateway.as_ref(), node_id).await? {
            if existing_namespace != namespace {
                return Err(NodeError::CrossNamespaceCollision { node_id: node_id.to_string(), existing_namespace });
            }
        }
        repo::upsert_node(gateway.as_ref(), namespace, node_id, display_name, description, &metadata).await?;

        Ok(Self {
            gateway,
            registry,
            router,
            namespace: namespace.to_string(),
            node_id: node_id.to_string(),
            logger,
            heartbeat_running: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Starts the 30-second heartbeat ticker, grounded in
    /// `r2e-scheduler`'s start/stop `AtomicBool` gate around a
    /// `tokio::time::interval` task. Idempotent — a second call is a no-op
    /// while the ticker is already running.
    pub fn start(self: &Arc<Self>) {
        if self.heartbeat_running.swap(true, Ordering::SeqCst) {
            return;
        }
        let node = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECONDS));
            loop {
                ticker.tick().await;
                if !node.heartbeat_running.load(Ordering::SeqCst) {
                    return;
                }
                if let Err(err) = repo::touch_heartbeat(node.gateway.as_ref(), &node.node_id).await {
                    node.logger.error(format!("heartbeat failed for node '{}': {err}", node.node_id));
                }
            }
        });
    }

    /// Idempotent; cancels the heartbeat ticker. Does not touch the
    /// registry or the node's row — registered handlers persist until
    /// explicitly unregistered, and the process-wide consumer keeps
    /// running (§4.6, §3.3 "on stop the ticker halts but registry
    /// entries persist until explicitly unregistered").
    pub fn stop(&self) {
        self.heartbeat_running.store(false, Ordering::SeqCst);
    }

    /// Terminal teardown (§4.9's `Stopped --close--> Closed`): stops the
    /// heartbeat if still running, drops every handler this node owns,
    /// and removes its row so liveness queries don't see a lingering
    /// ghost. Unlike `stop()`, this is not meant to be followed by
    /// `start()` again.
    pub async fn close(&self) {
        self.stop();
        self.registry.unregister_node(&self.node_id).await;
        if let Err(err) = repo::remove_node(self.gateway.as_ref(), &self.node_id).await {
            self.logger.warn(format!("failed to remove node row for '{}': {err}", self.node_id));
        }
    }

    pub async fn on_event(&self, event_type: &str, handler: Arc<dyn Handler>) -> HandlerId {
        self.registry.register(event_type, &self.node_id, handler).await
    }

    pub async fn off_event(&self, event_type: &str, handler_id: HandlerId) {
        self.registry.unregister(event_type, handler_id).await;
    }

    pub async fn emit(&self, event_type: &str, payload: Value) -> Result<MessageId, EmitError> {
        self.emit_inner(event_type, payload, None, false).await
    }

    /// Broadcasts to every handler in the process, ignoring `event_type`
    /// routing entirely (§9 "Broadcast dispatch").
    pub async fn emit_broadcast(&self, event_type: &str, payload: Value) -> Result<MessageId, EmitError> {
        self.emit_inner(event_type, payload, None, true).await
    }

    pub(crate) async fn emit_scheduled(
        &self,
        event_type: &str,
        payload: Value,
        scheduled_task_id: Uuid,
    ) -> Result<MessageId, EmitError> {
        self.emit_inner(event_type, payload, Some(scheduled_task_id), false).await
    }

    async fn emit_inner(
        &self,
        event_type: &str,
        payload: Value,
        scheduled_task_id: Option<Uuid>,
        broadcast: bool,
    ) -> Result<MessageId, EmitError> {
        emit::emit(
            self.gateway.as_ref(),
            self.router.as_deref(),
            self.logger.as_ref(),
            &self.namespace,
            &self.node_id,
            event_type,
            payload,
            scheduled_task_id,
            broadcast,
        )
        .await
    }
}
