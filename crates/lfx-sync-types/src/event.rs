//! Change events decoded from the KV change stream.

use bytes::Bytes;
use thiserror::Error;

use crate::payload::Payload;

/// Errors produced while decoding a change event.
#[derive(Debug, Error)]
pub enum EventError {
    /// The stream subject did not carry the expected `$KV.{bucket}.` prefix.
    #[error("subject {0:?} is not a KV subject for bucket {1:?}")]
    ForeignSubject(String, String),

    /// The event key had no kind prefix or no identifier segment.
    #[error("malformed event key {0:?}")]
    MalformedKey(String),

    /// A put event carried a payload that is not a JSON object.
    #[error("payload for key {key:?} is not a JSON object: {source}")]
    Payload {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The operation a change event represents.
///
/// KV deletes and purges both collapse to [`KvOperation::Delete`]; the
/// engine treats them identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvOperation {
    Put,
    Delete,
}

/// One decoded entry from the `v1-objects` change stream.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    /// Dot-delimited bucket key, e.g. `projects.sfid.P001`.
    pub key: String,
    pub operation: KvOperation,
    /// Stream sequence of the backing message, monotonic per consumer.
    pub sequence: u64,
    /// 1-based delivery attempt as reported by the broker.
    pub delivery_attempt: u64,
    /// Present for puts, absent for deletes.
    pub payload: Option<Payload>,
}

impl ChangeEvent {
    /// Decodes an event from the raw stream message parts.
    ///
    /// `subject` is the full stream subject (`$KV.v1-objects.projects.sfid.P001`);
    /// the bucket prefix is stripped to recover the key. Delete/purge events
    /// carry no payload regardless of the message body.
    pub fn decode(
        subject: &str,
        bucket: &str,
        operation: KvOperation,
        sequence: u64,
        delivery_attempt: u64,
        body: &Bytes,
    ) -> Result<Self, EventError> {
        let prefix = format!("$KV.{bucket}.");
        let key = subject
            .strip_prefix(&prefix)
            .ok_or_else(|| EventError::ForeignSubject(subject.to_string(), bucket.to_string()))?
            .to_string();

        if key.is_empty() || !key.contains('.') {
            return Err(EventError::MalformedKey(key));
        }

        let payload = match operation {
            KvOperation::Delete => None,
            KvOperation::Put => Some(Payload::from_bytes(body).map_err(|source| {
                EventError::Payload {
                    key: key.clone(),
                    source,
                }
            })?),
        };

        Ok(Self {
            key,
            operation,
            sequence,
            delivery_attempt,
            payload,
        })
    }

    /// First key segment: the collection prefix the dispatcher routes on.
    pub fn kind_prefix(&self) -> &str {
        self.key.split('.').next().unwrap_or("")
    }

    /// Last key segment: the v1 identifier. Handlers prefer the payload's id
    /// field for puts; the key is authoritative for deletes.
    pub fn key_id(&self) -> &str {
        self.key.rsplit('.').next().unwrap_or("")
    }
}
