//! The `Handler` trait invoked by the consumer for each matched target.
//!
//! A small `async_trait` interface consumed through `Arc<dyn Handler>`
//! rather than a raw boxed closure: a handler here is always called with
//! a connection borrowed from an open transaction, and `async_trait`'s
//! desugaring ties the returned future's lifetime to that borrow for
//! free, where a hand-rolled `Fn(...) -> Pin<Box<dyn Future<...>>>` would
//! need an explicit higher-ranked lifetime bound to do the same.

use crate::error::HandlerError;
use async_trait::async_trait;
use corebus_core::EventEnvelope;
use sqlx::PgConnection;

/// Application code invoked with `(envelope, connection)` under the
/// per-envelope transaction (§4.5, §5).
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, envelope: &EventEnvelope, conn: &mut PgConnection) -> Result<(), HandlerError>;
}

/// Opaque handle returned by [`crate::registry::HandlerRegistry::register`].
/// Callers must retain it and re-present it to `unregister` — per §9
/// "Handler equality", no structural/closure equality is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
    pub(crate) fn from_raw(value: u64) -> Self {
        Self(value)
    }
}
