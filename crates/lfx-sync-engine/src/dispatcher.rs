//! The record dispatcher: bounded-parallel consumption of the change
//! stream.
//!
//! Backpressure is a semaphore sized to the consumer's max-ack-pending:
//! no permit, no pull. Each message runs on its own task; outcomes map to
//! ack (applied / skipped / fatal) or delayed negative-ack (retry). On
//! cancellation the dispatcher stops pulling, drains in-flight handlers
//! up to a deadline, then aborts what remains — unacked messages come
//! back after the ack wait, so an abort never loses work.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, StreamExt};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use async_nats::jetstream::AckKind;

use lfx_sync_auth::PrincipalResolver;
use lfx_sync_broker::{BrokerError, ChangeConsumer, kv_operation};
use lfx_sync_config::BrokerConfig;
use lfx_sync_types::{ChangeEvent, KvOperation};

use crate::context::SyncContext;
use crate::outcome::Outcome;
use crate::registry::HandlerRegistry;

/// Dispatcher tuning, derived from the broker configuration.
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    /// Concurrent in-flight handlers; equals the consumer's
    /// max-ack-pending.
    pub max_in_flight: usize,
    /// The broker's delivery cap; at the final delivery a retry outcome
    /// becomes a drop-with-log.
    pub max_deliver: u64,
    /// Negative-ack redelivery delay.
    pub nak_delay: Duration,
    /// How long shutdown waits for in-flight handlers.
    pub drain_timeout: Duration,
    /// Input bucket name, for stripping stream subjects back to keys.
    pub bucket: String,
}

impl From<&BrokerConfig> for DispatcherSettings {
    fn from(config: &BrokerConfig) -> Self {
        Self {
            max_in_flight: usize::try_from(config.max_ack_pending.max(1)).unwrap_or(1),
            max_deliver: u64::try_from(config.max_deliver.max(1)).unwrap_or(1),
            nak_delay: Duration::from_secs(5),
            drain_timeout: Duration::from_secs(30),
            bucket: config.objects_bucket.clone(),
        }
    }
}

/// The consumer loop.
pub struct Dispatcher {
    inner: Arc<DispatchInner>,
    cancel: CancellationToken,
}

struct DispatchInner {
    registry: HandlerRegistry,
    resolver: Arc<PrincipalResolver>,
    settings: DispatcherSettings,
}

impl Dispatcher {
    pub fn new(
        registry: HandlerRegistry,
        resolver: Arc<PrincipalResolver>,
        settings: DispatcherSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(DispatchInner {
                registry,
                resolver,
                settings,
            }),
            cancel,
        }
    }

    /// Runs until cancellation or until the consumer stream ends.
    pub async fn run(&self, consumer: &ChangeConsumer) -> Result<(), BrokerError> {
        let mut messages = consumer.messages().await?;
        let semaphore = Arc::new(Semaphore::new(self.inner.settings.max_in_flight));
        let mut tasks = JoinSet::new();

        info!(
            max_in_flight = self.inner.settings.max_in_flight,
            "dispatcher running"
        );

        loop {
            // Backpressure: no permit, no pull.
            let permit = tokio::select! {
                () = self.cancel.cancelled() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => {
                    permit.expect("semaphore is never closed")
                }
            };

            let message = tokio::select! {
                () = self.cancel.cancelled() => break,
                next = messages.next() => match next {
                    Some(Ok(message)) => message,
                    Some(Err(error)) => {
                        warn!(%error, "consumer stream error");
                        continue;
                    }
                    None => {
                        warn!("consumer stream closed");
                        break;
                    }
                },
            };

            let inner = Arc::clone(&self.inner);
            tasks.spawn(async move {
                inner.process(message).await;
                drop(permit);
            });
        }

        self.drain(tasks).await;
        Ok(())
    }

    /// Waits for in-flight handlers up to the drain deadline, then aborts
    /// the stragglers.
    async fn drain(&self, mut tasks: JoinSet<()>) {
        if tasks.is_empty() {
            return;
        }
        info!(in_flight = tasks.len(), "draining in-flight handlers");
        let deadline = tokio::time::Instant::now() + self.inner.settings.drain_timeout;
        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        remaining = tasks.len(),
                        "drain deadline reached, aborting remaining handlers"
                    );
                    tasks.abort_all();
                    break;
                }
            }
        }
    }
}

impl DispatchInner {
    async fn process(&self, message: async_nats::jetstream::Message) {
        let (sequence, delivered) = message
            .info()
            .map(|info| (info.stream_sequence, u64::try_from(info.delivered).unwrap_or(1)))
            .unwrap_or((0, 1));
        let operation = kv_operation(&message);

        let event = match ChangeEvent::decode(
            message.subject.as_str(),
            &self.settings.bucket,
            operation,
            sequence,
            delivered,
            &message.payload,
        ) {
            Ok(event) => event,
            Err(error) => {
                error!(subject = %message.subject, %error, "malformed event, dropping");
                ack(&message).await;
                return;
            }
        };

        let Some(handler) = self.registry.get(event.kind_prefix()) else {
            debug!(key = %event.key, "no handler for prefix, ignoring");
            ack(&message).await;
            return;
        };

        let last_modified_by = event
            .payload
            .as_ref()
            .and_then(|payload| payload.str_field("last_modified_by"));
        let identity = self.resolver.resolve(last_modified_by).await;
        let ctx = SyncContext::new(identity, sequence, delivered);

        // A panicking handler must not leave the message in limbo; it is
        // translated into an ack-and-log like any other fatal fault.
        let result = match (event.operation, &event.payload) {
            (KvOperation::Put, Some(payload)) => {
                AssertUnwindSafe(handler.on_put(&ctx, &event, payload))
                    .catch_unwind()
                    .await
            }
            (KvOperation::Delete, _) => {
                AssertUnwindSafe(handler.on_delete(&ctx, &event))
                    .catch_unwind()
                    .await
            }
            (KvOperation::Put, None) => {
                error!(key = %event.key, "put event without payload, dropping");
                ack(&message).await;
                return;
            }
        };

        match result {
            Ok(Ok(Outcome::Applied)) => {
                debug!(key = %event.key, "applied");
                ack(&message).await;
            }
            Ok(Ok(Outcome::Skipped(reason))) => {
                debug!(key = %event.key, reason, "skipped");
                ack(&message).await;
            }
            Ok(Ok(Outcome::Retry(reason))) => {
                if delivered >= self.settings.max_deliver {
                    error!(
                        key = %event.key,
                        kind = %event.kind_prefix(),
                        v1_id = %event.key_id(),
                        reason,
                        delivered,
                        "retry budget exhausted, dropping"
                    );
                    ack(&message).await;
                } else {
                    debug!(key = %event.key, reason, delivered, "redelivery requested");
                    nak(&message, self.settings.nak_delay).await;
                }
            }
            Ok(Err(error)) => {
                error!(
                    key = %event.key,
                    kind = %event.kind_prefix(),
                    v1_id = %event.key_id(),
                    %error,
                    "fatal record error, dropping"
                );
                ack(&message).await;
            }
            Err(_panic) => {
                error!(
                    key = %event.key,
                    kind = %event.kind_prefix(),
                    v1_id = %event.key_id(),
                    "handler panicked, dropping"
                );
                ack(&message).await;
            }
        }
    }
}

async fn ack(message: &async_nats::jetstream::Message) {
    if let Err(error) = message.ack().await {
        warn!(%error, "ack failed; the message will be redelivered");
    }
}

async fn nak(message: &async_nats::jetstream::Message, delay: Duration) {
    if let Err(error) = message.ack_with(AckKind::Nak(Some(delay))).await {
        warn!(%error, "nak failed; redelivery falls back to the ack wait");
    }
}
