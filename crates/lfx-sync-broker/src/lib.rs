//! NATS JetStream facade for the LFX v1 sync worker.
//!
//! A thin wrapper over `async-nats` exposing exactly what the engine needs:
//! - a durable pull consumer over the `v1-objects` change stream
//! - core publish for index/access envelopes
//! - the two KV buckets (`v1-objects` input, `v1-mappings` state)
//!
//! Retry policy lives with the consumer configuration (`max_deliver = 3`,
//! explicit acks, 30 s ack wait); this crate only classifies failures as
//! retryable or not and leaves policy to the dispatcher.

mod client;
mod consumer;
mod error;

pub use client::{BrokerClient, KvBucket};
pub use consumer::{ChangeConsumer, ConsumerSettings, kv_operation};
pub use error::BrokerError;
