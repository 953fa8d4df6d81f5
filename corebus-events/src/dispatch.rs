//! Target resolution (§4.5.2 step 2–3), kept free of any I/O so it can be
//! unit tested against an in-memory [`HandlerRegistry`] without a database.
//! The actual transactional execution lives in [`crate::consumer`].

use crate::registry::{HandlerRegistry, Target};
use corebus_core::EventEnvelope;

/// The outcome of resolving dispatch targets for one envelope.
pub enum DispatchDecision {
    /// No handler is registered for this event type at all (broadcast: no
    /// handler is registered anywhere). The message is left for
    /// visibility-timeout redelivery, never DLQ'd on this basis alone.
    NoHandlersForType,
    /// Handlers exist, but every one of them is owned by the producer node
    /// (self-skip filtered all of them). Same non-acknowledgement policy
    /// as [`DispatchDecision::NoHandlersForType`].
    AllHandlersSelfOwned,
    /// At least one target survives self-skip filtering.
    Targets(Vec<Target>),
}

/// Resolves `envelope`'s dispatch targets against `registry`, implementing
/// §4.5.2 step 2 (broadcast vs. typed) and step 3 (the two "leave for
/// redelivery" cases).
pub async fn compute_targets(registry: &HandlerRegistry, envelope: &EventEnvelope) -> DispatchDecision {
    if envelope.is_broadcast() {
        let targets = registry.broadcast_targets(&envelope.producer_node_id).await;
        if !targets.is_empty() {
            return DispatchDecision::Targets(targets);
        }
        return if registry.is_empty().await {
            DispatchDecision::NoHandlersForType
        } else {
            DispatchDecision::AllHandlersSelfOwned
        };
    }

    if !registry.has_any_handler(&envelope.event_type).await {
        return DispatchDecision::NoHandlersForType;
    }
    let targets = registry.targets_for(&envelope.event_type, &envelope.producer_node_id).await;
    if targets.is_empty() {
        DispatchDecision::AllHandlersSelfOwned
    } else {
        DispatchDecision::Targets(targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use crate::handler::Handler;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct NoopHandler;

    #[async_trait]
    impl Handler for NoopHandler {
        async fn handle(&self, _envelope: &EventEnvelope, _conn: &mut sqlx::PgConnection) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    fn envelope(event_type: &str, producer: &str, broadcast: bool) -> EventEnvelope {
        let mut e = EventEnvelope::new("demo", event_type, serde_json::json!({}), producer);
        if broadcast {
            e = e.with_broadcast(true);
        }
        e
    }

    #[tokio::test]
    async fn no_handlers_at_all_yields_no_handlers_for_type() {
        let registry = HandlerRegistry::new();
        let decision = compute_targets(&registry, &envelope("orphan", "A", false)).await;
        assert!(matches!(decision, DispatchDecision::NoHandlersForType));
    }

    #[tokio::test]
    async fn handlers_exist_but_all_self_owned() {
        let registry = HandlerRegistry::new();
        registry.register("t", "A", Arc::new(NoopHandler)).await;
        let decision = compute_targets(&registry, &envelope("t", "A", false)).await;
        assert!(matches!(decision, DispatchDecision::AllHandlersSelfOwned));
    }

    #[tokio::test]
    async fn other_node_handler_is_a_target() {
        let registry = HandlerRegistry::new();
        registry.register("t", "B", Arc::new(NoopHandler)).await;
        let decision = compute_targets(&registry, &envelope("t", "A", false)).await;
        match decision {
            DispatchDecision::Targets(targets) => assert_eq!(targets.len(), 1),
            _ => panic!("expected targets"),
        }
    }

    #[tokio::test]
    async fn broadcast_ignores_event_type_and_skips_producer() {
        let registry = HandlerRegistry::new();
        registry.register("x", "A", Arc::new(NoopHandler)).await;
        registry.register("y", "B", Arc::new(NoopHandler)).await;
        registry.register("z", "B", Arc::new(NoopHandler)).await;

        let decision = compute_targets(&registry, &envelope("anything", "A", true)).await;
        match decision {
            DispatchDecision::Targets(targets) => {
                assert_eq!(targets.len(), 2);
                assert!(targets.iter().all(|t| t.node_id == "B"));
            }
            _ => panic!("expected targets"),
        }
    }

    #[tokio::test]
    async fn broadcast_with_only_producer_handlers_is_self_owned() {
        let registry = HandlerRegistry::new();
        registry.register("x", "A", Arc::new(NoopHandler)).await;
        let decision = compute_targets(&registry, &envelope("anything", "A", true)).await;
        assert!(matches!(decision, DispatchDecision::AllHandlersSelfOwned));
    }

    #[tokio::test]
    async fn broadcast_with_no_registrations_is_no_handlers() {
        let registry = HandlerRegistry::new();
        let decision = compute_targets(&registry, &envelope("anything", "A", true)).await;
        assert!(matches!(decision, DispatchDecision::NoHandlersForType));
    }
}
