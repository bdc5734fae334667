//! Handler outcomes.

/// What a handler decided about one event. The dispatcher maps `Applied`
/// and `Skipped` to an ack and `Retry` to a delayed negative-ack; fatal
/// errors travel as [`crate::EngineError`] and are acked with a log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The record's effects were applied (or were already in place).
    Applied,
    /// The record was deliberately not synced; the reason is logged.
    Skipped(&'static str),
    /// Transient obstacle; ask the broker to redeliver.
    Retry(String),
}

impl Outcome {
    pub fn is_retry(&self) -> bool {
        matches!(self, Outcome::Retry(_))
    }
}
