//! # corebus — a namespace-scoped, database-backed event bus
//!
//! ```no_run
//! # use corebus::CoreSystem;
//! # use corebus_core::ConnectOptions;
//! # use std::sync::Arc;
//! # async fn go() -> Result<(), Box<dyn std::error::Error>> {
//! let system = CoreSystem::connect(ConnectOptions::new("postgres://localhost/app", "demo")).await?;
//! let node = system.create_node("worker-a", Some("Worker A"), None, serde_json::json!({})).await?;
//! node.start();
//! node.on_event("user.created", Arc::new(MyHandler)).await;
//! node.emit("user.created", serde_json::json!({"userId": "123"})).await?;
//! # Ok(())
//! # }
//! # struct MyHandler;
//! # #[async_trait::async_trait]
//! # impl corebus_events::Handler for MyHandler {
//! #     async fn handle(&self, _e: &corebus_core::EventEnvelope, _c: &mut sqlx::PgConnection) -> Result<(), corebus_events::HandlerError> { Ok(()) }
//! # }
//! ```
//!
//! This crate is the glue: `corebus-core` (sanitizer, envelope, config,
//! logger), `corebus-data-sqlx` (pooled gateway, `pgmq` queue, schema
//! initializer), `corebus-events` (registry, consumer, node, emit), and
//! `corebus-scheduler`/`corebus-router` (cron façade and enhanced-mode
//! HTTP client) are all driver/logic crates that know nothing of each
//! other beyond the narrow traits they share (`Gateway`, `EventRouter`).
//! `CoreSystem` is where they are actually wired together behind one
//! `connect()` entry point.

pub mod error;
pub mod node;
pub mod system;

pub use error::ConnectError;
pub use node::NodeHandle;
pub use system::CoreSystem;

pub use corebus_core::{ConnectOptions, DeadLetterPayload, EventEnvelope, Level, Logger, LoggerExt, MessageId};
pub use corebus_events::{EmitError, Handler, HandlerError, HandlerId, NodeError};
pub use corebus_router::RouterError;
pub use corebus_scheduler::SchedulerError;

/// Re-exports of the most commonly used types, following the workspace's
/// own `prelude` convention (`corebus-core::prelude`, `corebus-events::prelude`).
pub mod prelude {
    pub use crate::{
        ConnectError, ConnectOptions, CoreSystem, DeadLetterPayload, EmitError, EventEnvelope, Handler,
        HandlerError, HandlerId, Level, Logger, LoggerExt, MessageId, NodeError, NodeHandle, RouterError,
        SchedulerError,
    };
}
