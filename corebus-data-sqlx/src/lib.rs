//! # corebus-data-sqlx — Postgres backend for corebus
//!
//! Everything in this crate is concrete Postgres: the pooled [`Gateway`],
//! the `pgmq`-backed [`queue`] operations, the embedded schema in [`sql`],
//! the idempotent [`init::initialize`] routine, and the typed row
//! wrappers in [`repo`]. `corebus-core` stays driver-agnostic; this is
//! where it meets a real database.

pub mod error;
pub mod gateway;
pub mod init;
pub mod queue;
pub mod repo;
pub mod sql;

pub use error::{GatewayError, InitError};
pub use gateway::{with_transaction, Gateway, PgGateway};
pub use queue::QueueMessage;

pub mod prelude {
    pub use crate::{with_transaction, Gateway, GatewayError, InitError, PgGateway, QueueMessage};
}
