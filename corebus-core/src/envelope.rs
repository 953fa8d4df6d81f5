//! Wire types exchanged over the queue and passed to handlers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The literal producer id stamped on envelopes emitted by a cron job.
pub const SCHEDULER_PRODUCER_ID: &str = "scheduler";

/// The JSON object exchanged over the queue and passed to handlers.
///
/// `messageId` and `redeliveryCount` are absent at enqueue time and filled
/// in by the consumer from the queue row once the message is read back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub namespace: String,
    pub event_type: String,
    #[serde(default = "serde_json::Value::default")]
    pub payload: serde_json::Value,
    pub emitted_at: DateTime<Utc>,
    pub producer_node_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_task_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redelivery_count: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broadcast: Option<bool>,
}

impl EventEnvelope {
    /// Start building an envelope for a direct `emit()` call.
    pub fn new(namespace: impl Into<String>, event_type: impl Into<String>, payload: serde_json::Value, producer_node_id: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            event_type: event_type.into(),
            payload,
            emitted_at: Utc::now(),
            producer_node_id: producer_node_id.into(),
            message_id: None,
            scheduled_task_id: None,
            redelivery_count: None,
            broadcast: None,
        }
    }

    pub fn with_broadcast(mut self, broadcast: bool) -> Self {
        self.broadcast = Some(broadcast);
        self
    }

    pub fn with_scheduled_task_id(mut self, task_id: Uuid) -> Self {
        self.scheduled_task_id = Some(task_id);
        self
    }

    pub fn is_broadcast(&self) -> bool {
        self.broadcast.unwrap_or(false)
    }

    /// Fill in the fields the consumer learns only once a row has been read
    /// from the queue, substituting defaults for anything the stored JSON
    /// was missing (§4.5.2 of the envelope decoration rules).
    pub fn decorate_from_read(mut self, message_id: i64, read_count: i32) -> Self {
        self.message_id = Some(message_id);
        self.redelivery_count = Some(read_count);
        self
    }
}

/// Best-effort parse of a raw queue payload into an envelope, substituting
/// defaults for any field the stored JSON is missing rather than failing
/// the whole read. `enqueued_at` is the queue row's own enqueue time, used
/// as the `emittedAt` fallback ahead of `Utc::now()` per §4.5.2 step 1
/// ("row enqueue time or now").
pub fn envelope_from_raw(raw: serde_json::Value, default_namespace: &str, enqueued_at: DateTime<Utc>) -> EventEnvelope {
    let obj = raw.as_object();
    let get_str = |key: &str, default: &str| -> String {
        obj.and_then(|o| o.get(key))
            .and_then(|v| v.as_str())
            .map(str::to_owned)
            .unwrap_or_else(|| default.to_owned())
    };
    let emitted_at = obj
        .and_then(|o| o.get("emittedAt"))
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(enqueued_at);
    let payload = obj
        .and_then(|o| o.get("payload"))
        .cloned()
        .unwrap_or_else(|| serde_json::json!({}));
    let broadcast = obj.and_then(|o| o.get("broadcast")).and_then(|v| v.as_bool());
    let scheduled_task_id = obj
        .and_then(|o| o.get("scheduledTaskId"))
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok());

    EventEnvelope {
        namespace: get_str("namespace", default_namespace),
        event_type: get_str("eventType", "unknown"),
        payload,
        emitted_at,
        producer_node_id: get_str("producerNodeId", "unknown"),
        message_id: None,
        scheduled_task_id,
        redelivery_count: None,
        broadcast,
    }
}

/// Payload sent to the dead-letter queue describing a handler failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetterPayload {
    pub original_event: EventEnvelope,
    pub reason: String,
    pub failed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeadLetterPayload {
    pub fn new(original_event: EventEnvelope, reason: impl Into<String>, error: Option<String>) -> Self {
        Self {
            original_event,
            reason: reason.into(),
            failed_at: Utc::now(),
            error,
        }
    }
}

/// Result of `emit()`. Standalone mode hands back the queue's own message
/// id; enhanced mode hands back the number of queues the router fanned the
/// envelope out to. These are different units of measure (§9 open
/// question 3) and are kept distinct rather than silently collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageId {
    /// The integer message id assigned by the queue extension at enqueue time.
    Queued(i64),
    /// The number of router-selected destination queues the envelope was routed to.
    Routed(usize),
}

impl MessageId {
    pub fn as_i64(&self) -> i64 {
        match *self {
            MessageId::Queued(id) => id,
            MessageId::Routed(count) => count as i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decorate_sets_message_fields() {
        let env = EventEnvelope::new("demo", "user.created", serde_json::json!({"a": 1}), "A");
        let decorated = env.decorate_from_read(42, 0);
        assert_eq!(decorated.message_id, Some(42));
        assert_eq!(decorated.redelivery_count, Some(0));
    }

    #[test]
    fn serializes_camel_case_without_absent_fields() {
        let env = EventEnvelope::new("demo", "user.created", serde_json::json!({}), "A");
        let value = serde_json::to_value(&env).unwrap();
        assert!(value.get("messageId").is_none());
        assert!(value.get("scheduledTaskId").is_none());
        assert_eq!(value.get("eventType").unwrap(), "user.created");
    }

    #[test]
    fn envelope_from_raw_fills_defaults() {
        let raw = serde_json::json!({});
        let enqueued_at = Utc::now();
        let env = envelope_from_raw(raw, "demo", enqueued_at);
        assert_eq!(env.namespace, "demo");
        assert_eq!(env.event_type, "unknown");
        assert_eq!(env.producer_node_id, "unknown");
        assert_eq!(env.payload, serde_json::json!({}));
        assert_eq!(env.emitted_at, enqueued_at);
    }

    #[test]
    fn envelope_from_raw_preserves_present_fields() {
        let raw = serde_json::json!({
            "namespace": "demo",
            "eventType": "user.created",
            "payload": {"userId": "123"},
            "producerNodeId": "A",
            "broadcast": true,
        });
        let env = envelope_from_raw(raw, "demo", Utc::now());
        assert_eq!(env.event_type, "user.created");
        assert_eq!(env.payload["userId"], "123");
        assert!(env.is_broadcast());
    }

    #[test]
    fn message_id_as_i64() {
        assert_eq!(MessageId::Queued(7).as_i64(), 7);
        assert_eq!(MessageId::Routed(3).as_i64(), 3);
    }
}
