//! A minimal two-node wiring of `corebus`: one node emits `order.placed`
//! events on a timer, another subscribes and prints what it receives.
//!
//! Run against a prepared Postgres instance (`pgmq`, `pg_cron`,
//! `pg_partman` installed):
//!
//! ```text
//! DATABASE_URL=postgres://localhost/corebus_demo COREBUS_NAMESPACE=demo cargo run -p basic-node
//! ```

use async_trait::async_trait;
use corebus::prelude::*;
use sqlx::PgConnection;
use std::sync::Arc;
use std::time::Duration;

struct OrderPlacedHandler;

#[async_trait]
impl Handler for OrderPlacedHandler {
    async fn handle(&self, envelope: &EventEnvelope, _conn: &mut PgConnection) -> Result<(), HandlerError> {
        tracing::info!(order_id = %envelope.payload["orderId"], producer = %envelope.producer_node_id, "order placed");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let options = ConnectOptions::from_env().unwrap_or_else(|_| {
        ConnectOptions::new("postgres://localhost/corebus_demo", "demo")
    });

    let system = CoreSystem::connect(options).await?;

    let shipping = system.create_node("shipping-worker", Some("Shipping worker"), None, serde_json::json!({})).await?;
    shipping.start();
    shipping.on_event("order.placed", Arc::new(OrderPlacedHandler)).await;

    let storefront = system.create_node("storefront", Some("Storefront"), None, serde_json::json!({})).await?;
    storefront.start();

    let mut tick = tokio::time::interval(Duration::from_secs(5));
    let mut order_number = 0u64;
    loop {
        tick.tick().await;
        order_number += 1;
        let order_id = format!("order-{order_number}");
        if let Err(err) = storefront.emit("order.placed", serde_json::json!({"orderId": order_id})).await {
            tracing::error!(%err, "failed to emit order.placed");
        }

        if order_number >= 3 {
            break;
        }
    }

    shipping.close().await;
    storefront.close().await;
    system.close().await;
    Ok(())
}
