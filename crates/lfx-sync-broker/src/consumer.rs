//! Durable pull consumer over the KV change stream.
//!
//! The consumer configuration is authoritative for retry policy: explicit
//! acks, at most 3 deliveries per message, 30 s ack wait, up to 1000
//! unacknowledged in flight. The durable name doubles as the delivery
//! group, so multiple worker instances form a load-balanced group.

use std::time::Duration;

use async_nats::jetstream::consumer::{AckPolicy, DeliverPolicy, pull};
use tracing::info;

use lfx_sync_config::BrokerConfig;
use lfx_sync_types::KvOperation;

use crate::client::BrokerClient;
use crate::error::BrokerError;

/// Pull-consumer parameters derived from configuration.
#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    /// Backing stream of the input bucket (`KV_{bucket}`).
    pub stream: String,
    /// Durable consumer name; shared by all worker instances.
    pub name: String,
    /// Subject filter restricting delivery to the input bucket.
    pub filter: String,
    pub ack_wait: Duration,
    pub max_deliver: i64,
    pub max_ack_pending: i64,
}

impl ConsumerSettings {
    /// Derives consumer settings from the broker configuration.
    pub fn from_config(config: &BrokerConfig) -> Self {
        Self {
            stream: format!("KV_{}", config.objects_bucket),
            name: config.consumer_name.clone(),
            filter: format!("$KV.{}.>", config.objects_bucket),
            ack_wait: Duration::from_secs(config.ack_wait_secs),
            max_deliver: config.max_deliver,
            max_ack_pending: config.max_ack_pending,
        }
    }
}

/// A bound durable pull consumer on the change stream.
pub struct ChangeConsumer {
    consumer: async_nats::jetstream::consumer::Consumer<pull::Config>,
}

impl ChangeConsumer {
    /// Creates or binds the durable consumer on the input bucket's stream.
    pub async fn bind(
        client: &BrokerClient,
        settings: &ConsumerSettings,
    ) -> Result<Self, BrokerError> {
        let stream = client
            .jetstream()
            .get_stream(&settings.stream)
            .await
            .map_err(|e| BrokerError::StreamUnavailable {
                stream: settings.stream.clone(),
                reason: e.to_string(),
            })?;

        let config = pull::Config {
            durable_name: Some(settings.name.clone()),
            description: Some("v1 sync worker change consumer".to_string()),
            ack_policy: AckPolicy::Explicit,
            ack_wait: settings.ack_wait,
            max_deliver: settings.max_deliver,
            max_ack_pending: settings.max_ack_pending,
            filter_subject: settings.filter.clone(),
            deliver_policy: DeliverPolicy::All,
            ..pull::Config::default()
        };

        let consumer = stream
            .get_or_create_consumer(&settings.name, config)
            .await
            .map_err(|e| BrokerError::ConsumerBind {
                name: settings.name.clone(),
                reason: e.to_string(),
            })?;

        info!(
            stream = %settings.stream,
            consumer = %settings.name,
            filter = %settings.filter,
            "durable consumer bound"
        );
        Ok(Self { consumer })
    }

    /// Opens the message stream. Backpressure comes from not polling it.
    pub async fn messages(&self) -> Result<pull::Stream, BrokerError> {
        self.consumer
            .messages()
            .await
            .map_err(|e| BrokerError::ConsumerBind {
                name: "messages".to_string(),
                reason: e.to_string(),
            })
    }
}

/// Classifies a change-stream message as put or delete from its KV
/// operation header. Deletes and purges collapse; absence of the header
/// means put.
pub fn kv_operation(message: &async_nats::Message) -> KvOperation {
    let op = message
        .headers
        .as_ref()
        .and_then(|headers| headers.get("KV-Operation"))
        .map(|value| value.as_str().to_string());

    match op.as_deref() {
        Some("DEL" | "PURGE") => KvOperation::Delete,
        _ => KvOperation::Put,
    }
}
