//! Per-process handler registry.
//!
//! `registry : map<event_type, set<(node_id, handler)>>` behind a single
//! `tokio::sync::RwLock`, keyed by `event_type: String` rather than a
//! Rust `TypeId` since routing here is data-driven (the event type
//! travels in the envelope, not in the Rust type system).
//!
//! A parallel flat `Vec` of every entry is kept so broadcast dispatch
//! doesn't walk the whole map per envelope.

use crate::handler::{Handler, HandlerId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
struct Entry {
    node_id: String,
    handler_id: HandlerId,
    handler: Arc<dyn Handler>,
}

struct Inner {
    by_type: HashMap<String, Vec<Entry>>,
    all: Vec<(String, Entry)>,
}

/// Shared, cloneable handle to the process-wide registry. Mutated by node
/// APIs (`on_event`/`off_event`), read by the consumer task.
#[derive(Clone)]
pub struct HandlerRegistry {
    inner: Arc<RwLock<Inner>>,
    next_id: Arc<AtomicU64>,
}

/// One resolved dispatch target: the owning node and the handler to call.
#[derive(Clone)]
pub struct Target {
    pub node_id: String,
    pub handler: Arc<dyn Handler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner { by_type: HashMap::new(), all: Vec::new() })),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Registers `handler` for `event_type` under `node_id` and returns the
    /// token callers must present to [`HandlerRegistry::unregister`].
    pub async fn register(&self, event_type: &str, node_id: &str, handler: Arc<dyn Handler>) -> HandlerId {
        let handler_id = HandlerId::from_raw(self.next_id.fetch_add(1, Ordering::Relaxed));
        let entry = Entry { node_id: node_id.to_string(), handler_id, handler };
        let mut inner = self.inner.write().await;
        inner.by_type.entry(event_type.to_string()).or_default().push(entry.clone());
        inner.all.push((event_type.to_string(), entry));
        handler_id
    }

    /// Removes the registration identified by `handler_id` under
    /// `event_type`. A no-op if it is already gone (unregistration is
    /// idempotent, matching the node stop/close contract in §4.9).
    pub async fn unregister(&self, event_type: &str, handler_id: HandlerId) {
        let mut inner = self.inner.write().await;
        if let Some(entries) = inner.by_type.get_mut(event_type) {
            entries.retain(|e| e.handler_id != handler_id);
            if entries.is_empty() {
                inner.by_type.remove(event_type);
            }
        }
        inner.all.retain(|(ty, e)| !(ty == event_type && e.handler_id == handler_id));
    }

    /// Removes every registration owned by `node_id`, used when a node is
    /// torn down without individually unregistering each handler.
    pub async fn unregister_node(&self, node_id: &str) {
        let mut inner = self.inner.write().await;
        inner.by_type.retain(|_, entries| {
            entries.retain(|e| e.node_id != node_id);
            !entries.is_empty()
        });
        inner.all.retain(|(_, e)| e.node_id != node_id);
    }

    /// Targets for a typed (non-broadcast) dispatch: every handler
    /// registered under `event_type`, excluding those owned by
    /// `producer_node_id`.
    pub async fn targets_for(&self, event_type: &str, producer_node_id: &str) -> Vec<Target> {
        let inner = self.inner.read().await;
        inner
            .by_type
            .get(event_type)
            .into_iter()
            .flatten()
            .filter(|e| e.node_id != producer_node_id)
            .map(|e| Target { node_id: e.node_id.clone(), handler: e.handler.clone() })
            .collect()
    }

    /// Whether `event_type` has any registered handler at all, regardless
    /// of ownership — used to distinguish "no handlers exist" from
    /// "handlers exist but were all filtered by self-skip" (§4.5.2 step 3).
    pub async fn has_any_handler(&self, event_type: &str) -> bool {
        let inner = self.inner.read().await;
        inner.by_type.get(event_type).is_some_and(|entries| !entries.is_empty())
    }

    /// Targets for a broadcast dispatch: every handler across every event
    /// type, excluding those owned by `producer_node_id`.
    pub async fn broadcast_targets(&self, producer_node_id: &str) -> Vec<Target> {
        let inner = self.inner.read().await;
        inner
            .all
            .iter()
            .filter(|(_, e)| e.node_id != producer_node_id)
            .map(|(_, e)| Target { node_id: e.node_id.clone(), handler: e.handler.clone() })
            .collect()
    }

    /// True when nothing at all is registered — the consumer's idle check
    /// in §4.5.1 step 1.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.all.is_empty()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use async_trait::async_trait;
    use corebus_core::EventEnvelope;
    use std::sync::atomic::AtomicUsize;

    struct CountingHandler(Arc<AtomicUsize>);

    #[async_trait]
    impl Handler for CountingHandler {
        async fn handle(&self, _envelope: &EventEnvelope, _conn: &mut sqlx::PgConnection) -> Result<(), HandlerError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn register_then_lookup_returns_entry() {
        let registry = HandlerRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        registry.register("user.created", "node-a", Arc::new(CountingHandler(counter))).await;

        let targets = registry.targets_for("user.created", "node-b").await;
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].node_id, "node-a");
    }

    #[tokio::test]
    async fn self_skip_filters_producer_node() {
        let registry = HandlerRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        registry.register("user.created", "node-a", Arc::new(CountingHandler(counter))).await;

        let targets = registry.targets_for("user.created", "node-a").await;
        assert!(targets.is_empty());
    }

    #[tokio::test]
    async fn has_any_handler_distinguishes_empty_from_all_self_owned() {
        let registry = HandlerRegistry::new();
        assert!(!registry.has_any_handler("user.created").await);

        let counter = Arc::new(AtomicUsize::new(0));
        registry.register("user.created", "node-a", Arc::new(CountingHandler(counter))).await;
        assert!(registry.has_any_handler("user.created").await);
        assert!(registry.targets_for("user.created", "node-a").await.is_empty());
    }

    #[tokio::test]
    async fn unregister_removes_only_matching_token() {
        let registry = HandlerRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let id_a = registry.register("t", "node-a", Arc::new(CountingHandler(counter.clone()))).await;
        let _id_b = registry.register("t", "node-b", Arc::new(CountingHandler(counter))).await;

        registry.unregister("t", id_a).await;
        let targets = registry.targets_for("t", "none").await;
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].node_id, "node-b");
    }

    #[tokio::test]
    async fn broadcast_targets_cross_event_types_excluding_producer() {
        let registry = HandlerRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        registry.register("x", "node-a", Arc::new(CountingHandler(counter.clone()))).await;
        registry.register("y", "node-b", Arc::new(CountingHandler(counter.clone()))).await;
        registry.register("z", "node-b", Arc::new(CountingHandler(counter))).await;

        let targets = registry.broadcast_targets("node-a").await;
        assert_eq!(targets.len(), 2);
        assert!(targets.iter().all(|t| t.node_id == "node-b"));
    }

    #[tokio::test]
    async fn unregister_node_drops_every_entry_it_owns() {
        let registry = HandlerRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        registry.register("x", "node-a", Arc::new(CountingHandler(counter.clone()))).await;
        registry.register("y", "node-a", Arc::new(CountingHandler(counter))).await;

        registry.unregister_node("node-a").await;
        assert!(registry.is_empty().await);
        assert!(!registry.has_any_handler("x").await);
    }
}
