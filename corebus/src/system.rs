//! [`CoreSystem`] — the one public type application code constructs.
//!
//! Owns the gateway, the handler registry, and the single process-wide
//! consumer (§3.3: "A process owns its database gateway, handler
//! registry, and single consumer task; these are created at connect,
//! destroyed at close."). There is no global state: multiple
//! `CoreSystem`s may coexist in one process against different
//! namespaces (§9 "Global state").

use crate::error::ConnectError;
use crate::node::NodeHandle;
use corebus_core::{dlq_name, queue_name, ConnectOptions, Logger, LoggerExt};
use corebus_data_sqlx::{init, Gateway, PgGateway};
use corebus_events::{Consumer, ConsumerOptions, EventRouter, HandlerRegistry, Node, NodeError};
use corebus_router::RouterClient;
use corebus_scheduler::{Scheduler, SchedulerError};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// The connected, running process handle. Construct with
/// [`CoreSystem::connect`]; tear down with [`CoreSystem::close`].
pub struct CoreSystem {
    gateway: Arc<dyn Gateway>,
    registry: HandlerRegistry,
    consumer: Arc<Consumer>,
    scheduler: Arc<Scheduler>,
    router_client: Option<Arc<RouterClient>>,
    namespace: String,
    worker_id: String,
    logger: Arc<dyn Logger>,
}

impl CoreSystem {
    /// Connects the gateway, idempotently initializes the schema/queues/
    /// partitions (§4.3), resolves standalone vs. enhanced mode, and
    /// starts the process-wide consumer. Any failure here is fatal and
    /// propagated to the caller (§7 "Initialization failure... fatal at
    /// connect").
    pub async fn connect(options: ConnectOptions) -> Result<Self, ConnectError> {
        let gateway: Arc<dyn Gateway> = Arc::new(PgGateway::connect(&options.connection_string).await?);
        let namespace = options.namespace();

        init::initialize(gateway.as_ref(), &namespace).await?;

        let router_client = resolve_router(&options, &namespace).await?;

        let registry = HandlerRegistry::new();
        let consumer = Arc::new(Consumer::new(
            gateway.clone(),
            registry.clone(),
            namespace.clone(),
            queue_name(&namespace),
            dlq_name(&namespace),
            ConsumerOptions {
                idle_poll_interval_ms: options.idle_poll_interval_ms,
                visibility_timeout_seconds: options.visibility_timeout_seconds,
                batch_size: options.batch_size,
            },
            options.logger.clone(),
        ));
        consumer.clone().spawn();

        let scheduler = Arc::new(Scheduler::new(gateway.clone()));

        options.logger.info(format!(
            "corebus connected: namespace='{namespace}', mode={}",
            if router_client.is_some() { "enhanced" } else { "standalone" }
        ));

        Ok(Self {
            gateway,
            registry,
            consumer,
            scheduler,
            router_client,
            namespace,
            worker_id: options.worker_id,
            logger: options.logger,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Registers a new node under this system's namespace. Rejects a
    /// cross-namespace `node_id` collision (§9 open question 2).
    pub async fn create_node(
        &self,
        node_id: &str,
        display_name: Option<&str>,
        description: Option<&str>,
        metadata: Value,
    ) -> Result<NodeHandle, NodeError> {
        let router: Option<Arc<dyn EventRouter>> =
            self.router_client.clone().map(|r| r as Arc<dyn EventRouter>);
        let node = Node::register(
            self.gateway.clone(),
            self.registry.clone(),
            router,
            &self.namespace,
            node_id,
            display_name,
            description,
            metadata,
            self.logger.clone(),
        )
        .await?;

        Ok(NodeHandle::new(
            Arc::new(node),
            self.scheduler.clone(),
            self.router_client.clone(),
            self.worker_id.clone(),
            self.logger.clone(),
        ))
    }

    /// Deactivates a scheduled task and unschedules its `pg_cron` job,
    /// independent of which (if any) node originally created it.
    pub async fn unschedule_task(&self, task_id: Uuid) -> Result<(), SchedulerError> {
        self.scheduler.unschedule_task(task_id).await
    }

    /// Signals cooperative shutdown: stops accepting new batches, waits
    /// for the in-flight one to drain, then closes the pool (§5
    /// "Cancellation and timeouts").
    pub async fn close(&self) {
        self.consumer.stop().await;
        self.gateway.pool().close().await;
        self.logger.info(format!("corebus closed: namespace='{}'", self.namespace));
    }
}

/// Resolves standalone vs. enhanced mode and, if enhanced, registers this
/// worker with the router (§4.7): `enable_workers` forces enhanced mode
/// given a non-empty endpoint; `auto_detect_workers` instead probes
/// `health_check()` and falls back to standalone on failure or timeout.
async fn resolve_router(options: &ConnectOptions, namespace: &str) -> Result<Option<Arc<RouterClient>>, ConnectError> {
    if !options.wants_enhanced_mode() {
        return Ok(None);
    }
    let endpoint = options
        .worker_api_endpoint
        .clone()
        .expect("wants_enhanced_mode() only returns true when worker_api_endpoint is non-empty");

    let enhanced = if options.enable_workers {
        true
    } else {
        RouterClient::new(endpoint.clone()).health_check().await
    };

    if !enhanced {
        return Ok(None);
    }

    let client = RouterClient::new(endpoint);
    client
        .register_worker(&options.worker_id, namespace, &[])
        .await
        .map_err(ConnectError::RouterRegistration)?;
    Ok(Some(Arc::new(client)))
}
