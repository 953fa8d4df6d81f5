//! Structured logging capability.
//!
//! The core treats its log sink as a small capability, per the polymorphism
//! note in the design docs: application code may supply its own [`Logger`],
//! but a `tracing`-backed [`ConsoleLogger`] is provided as the default so
//! the crate is usable without any wiring.

use std::fmt;
use std::sync::Arc;

/// Severity of a log line emitted by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

/// A structured log sink.
///
/// Implementations must be cheap to call from hot paths (the consumer loop
/// logs on every idle tick at `Info` level in debug builds and on every
/// error condition) and must never panic.
pub trait Logger: Send + Sync {
    fn log(&self, level: Level, message: &str);
}

/// Default logger: forwards to `tracing`'s global subscriber.
///
/// Consuming applications configure the actual sink (stdout, JSON, an
/// OpenTelemetry exporter, ...) by installing a `tracing_subscriber`
/// subscriber themselves; this type only decides the level mapping.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::Info => tracing::info!(target: "corebus", "{message}"),
            Level::Warn => tracing::warn!(target: "corebus", "{message}"),
            Level::Error => tracing::error!(target: "corebus", "{message}"),
        }
    }
}

/// Convenience wrapper so call sites can write `logger.info("...")` instead
/// of `logger.log(Level::Info, "...")`.
pub trait LoggerExt {
    fn info(&self, message: impl fmt::Display);
    fn warn(&self, message: impl fmt::Display);
    fn error(&self, message: impl fmt::Display);
}

impl LoggerExt for Arc<dyn Logger> {
    fn info(&self, message: impl fmt::Display) {
        self.log(Level::Info, &message.to_string());
    }
    fn warn(&self, message: impl fmt::Display) {
        self.log(Level::Warn, &message.to_string());
    }
    fn error(&self, message: impl fmt::Display) {
        self.log(Level::Error, &message.to_string());
    }
}

pub fn default_logger() -> Arc<dyn Logger> {
    Arc::new(ConsoleLogger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingLogger {
        lines: Mutex<Vec<(Level, String)>>,
    }

    impl Logger for RecordingLogger {
        fn log(&self, level: Level, message: &str) {
            self.lines.lock().unwrap().push((level, message.to_string()));
        }
    }

    #[test]
    fn console_logger_does_not_panic() {
        let logger: Arc<dyn Logger> = default_logger();
        logger.info("hello");
        logger.warn("careful");
        logger.error("boom");
    }

    #[test]
    fn custom_logger_records_level_and_message() {
        let recorder = Arc::new(RecordingLogger { lines: Mutex::new(Vec::new()) });
        let logger: Arc<dyn Logger> = recorder.clone();
        logger.warn("disk low");
        let lines = recorder.lines.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, Level::Warn);
        assert_eq!(lines[0].1, "disk low");
    }
}
