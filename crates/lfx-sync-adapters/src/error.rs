//! Adapter error classification.

use thiserror::Error;

/// Outcome classification for downstream calls.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// 5xx, network failure, or broker publish failure. Retryable.
    #[error("transient downstream failure: {0}")]
    Transient(String),

    /// 4xx other than 412. Fatal per record; acked and logged.
    #[error("downstream rejected the request ({status}): {body}")]
    Logical { status: u16, body: String },

    /// 412: the entity tag went stale between fetch and update.
    #[error("entity tag precondition failed")]
    PreconditionFailed,

    /// The downstream answered 2xx but the body was not what the contract
    /// promises. Fatal per record.
    #[error("cannot decode downstream response: {0}")]
    Decode(String),
}

impl AdapterError {
    /// Whether the dispatcher should request redelivery. Entity-tag
    /// conflicts are handled separately (retry once, then escalate).
    pub fn is_retryable(&self) -> bool {
        matches!(self, AdapterError::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_is_retryable() {
        assert!(AdapterError::Transient("x".to_string()).is_retryable());
        assert!(
            !AdapterError::Logical {
                status: 404,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(!AdapterError::PreconditionFailed.is_retryable());
        assert!(!AdapterError::Decode("x".to_string()).is_retryable());
    }
}
