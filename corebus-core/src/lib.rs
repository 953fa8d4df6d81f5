//! # corebus-core — shared abstractions for the corebus event bus
//!
//! This crate has no database driver dependency. It holds the pieces that
//! are pure functions of in-memory state and are therefore the easiest to
//! unit test: the identifier sanitizer, the envelope wire types, the
//! `Logger` capability, and the `ConnectOptions` configuration struct.
//!
//! The concrete Postgres-backed gateway, queue, and initializer live in
//! [`corebus-data-sqlx`](https://docs.rs/corebus-data-sqlx).

pub mod config;
pub mod envelope;
pub mod ident;
pub mod logger;

pub use config::ConnectOptions;
pub use envelope::{envelope_from_raw, DeadLetterPayload, EventEnvelope, MessageId, SCHEDULER_PRODUCER_ID};
pub use ident::{dlq_name, queue_name, sanitize};
pub use logger::{default_logger, ConsoleLogger, Level, Logger, LoggerExt};

/// Re-exports of the most commonly used types.
pub mod prelude {
    pub use crate::{
        sanitize, ConnectOptions, DeadLetterPayload, EventEnvelope, Level, Logger, LoggerExt, MessageId,
    };
}
