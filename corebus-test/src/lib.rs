//! # corebus-test — shared test fixtures
//!
//! A small harness crate, grounded in the teacher's own `r2e-test` (a
//! dedicated crate that exists only to give the rest of the workspace a
//! place to put test helpers instead of duplicating them per-crate).
//!
//! Unlike `r2e-test`'s in-process HTTP client, `Gateway::begin`/`pool`
//! return concrete `sqlx` types tied to a real Postgres connection, so
//! there is no way to hand tests an in-memory fake `Gateway` — any test
//! that needs one opens a real pool against `DATABASE_URL` and is gated
//! behind `#[ignore]`. What this crate *can* give every other crate's
//! unit tests is a [`RecordingLogger`] (observe what got logged without a
//! subscriber) and a couple of envelope builders for constructing
//! fixtures tersely.

use corebus_core::EventEnvelope;
use std::sync::Mutex;

/// Severity/message pairs recorded by [`RecordingLogger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedLine {
    pub level: corebus_core::Level,
    pub message: String,
}

/// A [`corebus_core::Logger`] that stores every call instead of forwarding
/// to `tracing`, so a test can assert on what a failure path logged.
#[derive(Default)]
pub struct RecordingLogger {
    lines: Mutex<Vec<LoggedLine>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<LoggedLine> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains(&self, level: corebus_core::Level, needle: &str) -> bool {
        self.lines().into_iter().any(|l| l.level == level && l.message.contains(needle))
    }
}

impl corebus_core::Logger for RecordingLogger {
    fn log(&self, level: corebus_core::Level, message: &str) {
        self.lines.lock().unwrap().push(LoggedLine { level, message: message.to_string() });
    }
}

/// Builds a minimal, non-broadcast envelope for a given type and producer.
pub fn sample_envelope(event_type: &str, producer_node_id: &str) -> EventEnvelope {
    EventEnvelope::new("test-namespace", event_type, serde_json::json!({}), producer_node_id)
}

/// Builds a broadcast envelope for a given producer.
pub fn sample_broadcast_envelope(producer_node_id: &str) -> EventEnvelope {
    EventEnvelope::new("test-namespace", "broadcast.event", serde_json::json!({}), producer_node_id).with_broadcast(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use corebus_core::{Level, Logger};

    #[test]
    fn recording_logger_captures_calls() {
        let logger = RecordingLogger::new();
        logger.log(Level::Warn, "disk low");
        assert!(logger.contains(Level::Warn, "disk low"));
        assert!(!logger.contains(Level::Error, "disk low"));
    }

    #[test]
    fn sample_envelope_is_not_broadcast_by_default() {
        let env = sample_envelope("user.created", "node-a");
        assert!(!env.is_broadcast());
        assert_eq!(env.event_type, "user.created");
    }

    #[test]
    fn sample_broadcast_envelope_is_broadcast() {
        let env = sample_broadcast_envelope("node-a");
        assert!(env.is_broadcast());
    }
}
