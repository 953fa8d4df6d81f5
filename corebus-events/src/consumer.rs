//! The process-wide polling consumer (§4.5).
//!
//! One task per process, started by `CoreSystem::connect` and stopped by
//! `CoreSystem::close`. Cancellation is cooperative, grounded in the
//! teacher's `r2e-scheduler::SchedulerHandle` — a `CancellationToken` plus
//! a plain `AtomicBool` gate — rather than aborting the task mid-transaction.

use crate::dispatch::{compute_targets, DispatchDecision};
use crate::error::HandlerError;
use crate::registry::{HandlerRegistry, Target};
use corebus_core::{envelope_from_raw, DeadLetterPayload, EventEnvelope, Logger, LoggerExt};
use corebus_data_sqlx::{queue, with_transaction, Gateway};
use sqlx::{Postgres, Transaction};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Polling/backoff parameters the consumer reads on every loop iteration.
#[derive(Clone)]
pub struct ConsumerOptions {
    pub idle_poll_interval_ms: u64,
    pub visibility_timeout_seconds: u64,
    pub batch_size: i32,
}

pub struct Consumer {
    gateway: Arc<dyn Gateway>,
    registry: HandlerRegistry,
    namespace: String,
    queue_name: String,
    dlq_name: String,
    options: ConsumerOptions,
    logger: Arc<dyn Logger>,
    running: Arc<AtomicBool>,
    cancel: CancellationToken,
    drained: Arc<Notify>,
}

impl Consumer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gateway: Arc<dyn Gateway>,
        registry: HandlerRegistry,
        namespace: String,
        queue_name: String,
        dlq_name: String,
        options: ConsumerOptions,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            gateway,
            registry,
            namespace,
            queue_name,
            dlq_name,
            options,
            logger,
            running: Arc::new(AtomicBool::new(true)),
            cancel: CancellationToken::new(),
            drained: Arc::new(Notify::new()),
        }
    }

    /// Spawns the loop as its own task and returns a handle other code
    /// never needs to join — shutdown is signalled through [`Consumer::stop`].
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    /// Signals cooperative shutdown and waits for the in-flight batch (if
    /// any) to drain, matching §5's cancellation contract.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.cancel.cancel();
        self.drained.notified().await;
    }

    async fn run(&self) {
        loop {
            if !self.running.load(Ordering::SeqCst) {
                self.drained.notify_waiters();
                return;
            }

            if self.registry.is_empty().await {
                self.sleep_idle().await;
                continue;
            }

            let batch = match queue::read(
                self.gateway.as_ref(),
                &self.queue_name,
                self.options.visibility_timeout_seconds as i32,
                self.options.batch_size,
            )
            .await
            {
                Ok(batch) => batch,
                Err(err) => {
                    self.logger.error(format!("queue read failed on '{}': {err}", self.queue_name));
                    self.sleep_or_cancel(Duration::from_secs(2)).await;
                    continue;
                }
            };

            if batch.is_empty() {
                self.sleep_idle().await;
                continue;
            }

            for message in batch {
                if !self.running.load(Ordering::SeqCst) {
                    break;
                }
                self.dispatch_one(message).await;
            }

            self.drained.notify_waiters();
        }
    }

    async fn sleep_idle(&self) {
        self.sleep_or_cancel(Duration::from_millis(self.options.idle_poll_interval_ms)).await;
    }

    async fn sleep_or_cancel(&self, duration: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.cancel.cancelled() => {}
        }
    }

    async fn dispatch_one(&self, message: queue::QueueMessage) {
        let envelope = envelope_from_raw(message.message.clone(), &self.namespace, message.enqueued_at)
            .decorate_from_read(message.msg_id, message.read_ct);

        match compute_targets(&self.registry, &envelope).await {
            DispatchDecision::NoHandlersForType | DispatchDecision::AllHandlersSelfOwned => {
                // Leave invisible until the visibility timeout expires; do
                // not ack, do not DLQ (§4.5.2 step 3, §9 open question 1).
            }
            DispatchDecision::Targets(targets) => match self.run_targets(&envelope, &targets).await {
                Ok(()) => self.ack(message.msg_id).await,
                Err(handler_err) => {
                    self.move_to_dlq(&envelope, &handler_err).await;
                    self.ack(message.msg_id).await;
                }
            },
        }
    }

    /// Runs every target handler sequentially inside one transaction
    /// (§4.5.2 step 4, §5 "handler execution is serial within an envelope").
    /// The first failure stops the chain; the transaction rolls back by
    /// being dropped without a commit.
    async fn run_targets(&self, envelope: &EventEnvelope, targets: &[Target]) -> Result<(), HandlerError> {
        with_transaction(self.gateway.as_ref(), |tx: &mut Transaction<'static, Postgres>| async move {
            for target in targets {
                target.handler.handle(envelope, &mut *tx).await?;
            }
            Ok(())
        })
        .await
    }

    async fn move_to_dlq(&self, envelope: &EventEnvelope, err: &HandlerError) {
        let payload = DeadLetterPayload::new(envelope.clone(), "Handler execution error", Some(err.to_string()));
        match serde_json::to_value(&payload) {
            Ok(value) => {
                if let Err(send_err) = queue::send(self.gateway.as_ref(), &self.dlq_name, &value).await {
                    self.logger.error(format!("DLQ send failed on '{}': {send_err}", self.dlq_name));
                }
            }
            Err(err) => self.logger.error(format!("failed to serialize dead-letter payload: {err}")),
        }
    }

    async fn ack(&self, msg_id: i64) {
        if let Err(err) = queue::delete(self.gateway.as_ref(), &self.queue_name, msg_id).await {
            self.logger.error(format!("ack failed for message {msg_id} on '{}': {err}", self.queue_name));
        }
    }
}
