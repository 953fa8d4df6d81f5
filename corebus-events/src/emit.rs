//! The `emit()` construction/dispatch/append path (§4.7).
//!
//! Standalone mode enqueues directly onto the namespace's `pgmq` queue.
//! Enhanced mode hands the envelope to a router collaborator instead —
//! modeled as the small [`EventRouter`] trait here rather than a direct
//! dependency on `corebus-router`, so this crate does not need to know
//! about `reqwest` at all; `corebus-router::RouterClient` implements it.

use crate::error::EmitError;
use async_trait::async_trait;
use corebus_core::{queue_name, EventEnvelope, Logger, LoggerExt, MessageId};
use corebus_data_sqlx::{queue, repo, Gateway};
use serde_json::Value;
use uuid::Uuid;

/// The enhanced-mode collaborator: something that can fan an envelope out
/// to zero or more destination queues and report how many it reached.
#[async_trait]
pub trait EventRouter: Send + Sync {
    async fn route(&self, envelope: &EventEnvelope) -> Result<usize, String>;
}

/// Constructs an envelope, enqueues or routes it, then appends it to the
/// durable event log. Enqueue/route failures propagate; a log-append
/// failure after a successful enqueue is logged and swallowed (§9 open
/// question 5 — the core keeps "enqueue before append" and accepts the
/// narrow could-log-without-having-delivered gap as the lesser one).
#[allow(clippy::too_many_arguments)]
pub async fn emit(
    gateway: &dyn Gateway,
    router: Option<&dyn EventRouter>,
    logger: &dyn Logger,
    namespace: &str,
    producer_node_id: &str,
    event_type: &str,
    payload: Value,
    scheduled_task_id: Option<Uuid>,
    broadcast: bool,
) -> Result<MessageId, EmitError> {
    let mut envelope = EventEnvelope::new(namespace, event_type, payload.clone(), producer_node_id)
        .with_broadcast(broadcast);
    if let Some(task_id) = scheduled_task_id {
        envelope = envelope.with_scheduled_task_id(task_id);
    }

    let message_id = match router {
        Some(router) => {
            let routed_count = router.route(&envelope).await.map_err(EmitError::Router)?;
            MessageId::Routed(routed_count)
        }
        None => {
            if broadcast {
                logger.warn(format!(
                    "broadcast emit of '{event_type}' in namespace '{namespace}' has no router in standalone mode; enqueuing to the namespace queue like a normal emit"
                ));
            }
            let value = serde_json::to_value(&envelope).unwrap_or_else(|_| serde_json::json!({}));
            let msg_id = queue::send(gateway, &queue_name(namespace), &value).await?;
            MessageId::Queued(msg_id)
        }
    };

    let metadata = serde_json::json!({
        "messageId": message_id.as_i64(),
        "broadcast": broadcast,
    });

    if let Err(err) =
        repo::append_event_log(gateway, namespace, event_type, &payload, producer_node_id, scheduled_task_id, &metadata).await
    {
        logger.warn(format!("event log append failed for '{event_type}' in namespace '{namespace}': {err}"));
    }

    Ok(message_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_broadcast_and_task_id() {
        let env = EventEnvelope::new("demo", "t", serde_json::json!({}), "A")
            .with_broadcast(true)
            .with_scheduled_task_id(Uuid::nil());
        assert!(env.is_broadcast());
        assert_eq!(env.scheduled_task_id, Some(Uuid::nil()));
    }

    #[test]
    fn broadcast_metadata_is_stamped_regardless_of_mode() {
        let metadata = serde_json::json!({
            "messageId": MessageId::Queued(7).as_i64(),
            "broadcast": true,
        });
        assert_eq!(metadata["broadcast"], true);
        assert_eq!(metadata["messageId"], 7);
    }
}
