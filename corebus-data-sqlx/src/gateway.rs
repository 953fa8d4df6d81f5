//! Pooled Postgres gateway.
//!
//! `Gateway` is kept deliberately small and free of generic methods so that
//! `Arc<dyn Gateway>` can be shared across the node, the consumer loop, and
//! the scheduler. The transactional "begin, run, commit-or-rollback"
//! combinator used by the consumer to run a handler under one transaction
//! (append to the event log, update cursors, hand off to the handler) is a
//! free function instead of a trait method, since a generic `F: FnOnce(...)`
//! parameter would make the trait non-object-safe.

use crate::error::GatewayError;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use std::future::Future;
use std::time::Duration;

/// A handle to the pooled Postgres connection backing one `CoreSystem`.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Runs a statement that returns no rows.
    async fn execute(&self, sql: &str) -> Result<(), GatewayError>;

    /// Begins a new transaction against the pool.
    async fn begin(&self) -> Result<Transaction<'static, Postgres>, GatewayError>;

    /// The underlying pool, for callers that need `sqlx::query`/`query_as`
    /// directly (the repository helpers in [`crate::repo`], the queue
    /// operations in [`crate::queue`]).
    fn pool(&self) -> &PgPool;
}

/// Default [`Gateway`] implementation: a plain `sqlx::PgPool`.
#[derive(Clone)]
pub struct PgGateway {
    pool: PgPool,
}

impl PgGateway {
    /// Connects a pool of up to 10 connections, per the design docs' default
    /// pool sizing (the same ceiling the teacher's Postgres example uses).
    pub async fn connect(connection_string: &str) -> Result<Self, GatewayError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(10))
            .connect(connection_string)
            .await
            .map_err(GatewayError::connection)?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Gateway for PgGateway {
    async fn execute(&self, sql: &str) -> Result<(), GatewayError> {
        sqlx::query(sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, GatewayError> {
        self.pool.begin().await.map_err(GatewayError::connection)
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Runs `f` inside a fresh transaction, committing on `Ok` and rolling back
/// (by dropping the transaction without a commit) on `Err`. This is a free
/// function rather than a `Gateway` method so the trait stays object-safe;
/// see the module docs. Generic over the error type so callers whose `f`
/// fails with their own error (a handler's `HandlerError`, a scheduler's
/// `SchedulerError`) don't have to first collapse it into `GatewayError`.
pub async fn with_transaction<F, Fut, T, E>(gateway: &dyn Gateway, f: F) -> Result<T, E>
where
    F: for<'c> FnOnce(&'c mut Transaction<'static, Postgres>) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<GatewayError>,
{
    let mut tx = gateway.begin().await.map_err(E::from)?;
    match f(&mut tx).await {
        Ok(value) => {
            tx.commit().await.map_err(GatewayError::connection).map_err(E::from)?;
            Ok(value)
        }
        Err(err) => Err(err),
    }
}
