//! Publish adapter: envelopes onto kind-specific broker subjects.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use tracing::debug;

use lfx_sync_broker::BrokerClient;

use crate::error::AdapterError;

/// Serializes and publishes envelopes. The engine holds this trait; tests
/// substitute a recording fake.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish_json(&self, subject: &str, value: &Value) -> Result<(), AdapterError>;
}

/// Production publisher over the shared broker connection. Publish
/// failures are always retryable.
pub struct BrokerPublisher {
    client: BrokerClient,
}

impl BrokerPublisher {
    pub fn new(client: BrokerClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Publisher for BrokerPublisher {
    async fn publish_json(&self, subject: &str, value: &Value) -> Result<(), AdapterError> {
        let payload = serde_json::to_vec(value)
            .map_err(|e| AdapterError::Decode(format!("envelope does not serialize: {e}")))?;
        self.client
            .publish(subject, Bytes::from(payload))
            .await
            .map_err(|e| AdapterError::Transient(e.to_string()))?;
        debug!(subject, "envelope published");
        Ok(())
    }
}
