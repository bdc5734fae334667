//! Broker error types.

use thiserror::Error;

/// Errors surfaced by the broker facade.
///
/// Connection-phase errors are fatal for bootstrap; steady-state KV and
/// publish failures are retryable and the dispatcher decides what to do
/// with them.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Could not establish the broker connection.
    #[error("broker connection to {url} failed: {reason}")]
    Connect { url: String, reason: String },

    /// A required KV bucket does not exist.
    #[error("KV bucket {bucket:?} is absent: {reason}")]
    BucketAbsent { bucket: String, reason: String },

    /// The change stream backing the input bucket could not be resolved.
    #[error("change stream {stream:?} unavailable: {reason}")]
    StreamUnavailable { stream: String, reason: String },

    /// The durable consumer could not be created or bound.
    #[error("consumer {name:?} bind failed: {reason}")]
    ConsumerBind { name: String, reason: String },

    /// A KV read failed.
    #[error("KV get {bucket}/{key} failed: {reason}")]
    KvGet {
        bucket: String,
        key: String,
        reason: String,
    },

    /// A KV write failed.
    #[error("KV put {bucket}/{key} failed: {reason}")]
    KvPut {
        bucket: String,
        key: String,
        reason: String,
    },

    /// A core publish failed.
    #[error("publish on {subject:?} failed: {reason}")]
    Publish { subject: String, reason: String },
}

impl BrokerError {
    /// Whether the failure is transient. Bootstrap-phase errors are not;
    /// everything in the steady-state data path is.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BrokerError::KvGet { .. } | BrokerError::KvPut { .. } | BrokerError::Publish { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_path_errors_are_retryable() {
        let err = BrokerError::Publish {
            subject: "lfx.index.vote".to_string(),
            reason: "timed out".to_string(),
        };
        assert!(err.is_retryable());

        let err = BrokerError::Connect {
            url: "nats://x".to_string(),
            reason: "refused".to_string(),
        };
        assert!(!err.is_retryable());
    }
}
