//! Broker connection and KV bucket handles.

use async_nats::jetstream;
use bytes::Bytes;
use tracing::info;

use crate::error::BrokerError;

/// Shared broker connection: one core client plus its JetStream context.
#[derive(Clone)]
pub struct BrokerClient {
    client: async_nats::Client,
    jetstream: jetstream::Context,
}

impl BrokerClient {
    /// Connects to the broker. The connection name carries the service name
    /// so instances are identifiable in broker monitoring.
    pub async fn connect(url: &str, service_name: &str) -> Result<Self, BrokerError> {
        let client = async_nats::ConnectOptions::new()
            .name(service_name)
            .connect(url)
            .await
            .map_err(|e| BrokerError::Connect {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        info!(url, "broker connection established");
        let jetstream = jetstream::new(client.clone());
        Ok(Self { client, jetstream })
    }

    /// Opens an existing KV bucket. Absence is a bootstrap failure; the
    /// worker never creates buckets itself.
    pub async fn key_value(&self, bucket: &str) -> Result<KvBucket, BrokerError> {
        let store = self
            .jetstream
            .get_key_value(bucket)
            .await
            .map_err(|e| BrokerError::BucketAbsent {
                bucket: bucket.to_string(),
                reason: e.to_string(),
            })?;
        Ok(KvBucket {
            store,
            bucket: bucket.to_string(),
        })
    }

    /// Publishes a message on a core subject and flushes it out.
    pub async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), BrokerError> {
        self.client
            .publish(subject.to_string(), payload)
            .await
            .map_err(|e| BrokerError::Publish {
                subject: subject.to_string(),
                reason: e.to_string(),
            })?;
        self.client
            .flush()
            .await
            .map_err(|e| BrokerError::Publish {
                subject: subject.to_string(),
                reason: e.to_string(),
            })
    }

    /// Whether the underlying connection is currently established.
    pub fn is_connected(&self) -> bool {
        self.client.connection_state() == async_nats::connection::State::Connected
    }

    pub(crate) fn jetstream(&self) -> &jetstream::Context {
        &self.jetstream
    }
}

/// Handle to one KV bucket.
#[derive(Clone)]
pub struct KvBucket {
    store: jetstream::kv::Store,
    bucket: String,
}

impl KvBucket {
    /// Reads the latest value for `key`. `None` means the key is absent
    /// (never written, deleted, or purged).
    pub async fn get(&self, key: &str) -> Result<Option<Bytes>, BrokerError> {
        self.store.get(key).await.map_err(|e| BrokerError::KvGet {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    /// Writes `value` under `key`, returning the new revision.
    pub async fn put(&self, key: &str, value: Bytes) -> Result<u64, BrokerError> {
        self.store
            .put(key, value)
            .await
            .map_err(|e| BrokerError::KvPut {
                bucket: self.bucket.clone(),
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    /// The bucket name this handle points at.
    pub fn name(&self) -> &str {
        &self.bucket
    }
}
