//! Per-event handler context.

use lfx_sync_auth::Identity;

/// Audience-table keys for the downstream services.
pub const AUD_PROJECT: &str = "project-service";
pub const AUD_COMMITTEE: &str = "committee-service";
pub const AUD_INDEXER: &str = "indexer";

/// Immutable context passed into every handler invocation: the identity
/// resolved from the record's `last_modified_by` plus the v1 operation
/// metadata. Attribution is per-record, so this travels as a value rather
/// than anything task-local.
#[derive(Debug, Clone)]
pub struct SyncContext {
    pub identity: Identity,
    /// Stream sequence of the backing message.
    pub sequence: u64,
    /// 1-based delivery attempt; drives the entity-tag conflict
    /// escalation and the final-delivery drop log.
    pub delivery_attempt: u64,
}

impl SyncContext {
    pub fn new(identity: Identity, sequence: u64, delivery_attempt: u64) -> Self {
        Self {
            identity,
            sequence,
            delivery_attempt,
        }
    }
}
