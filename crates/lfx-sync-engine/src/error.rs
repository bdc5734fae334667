//! Engine error types.
//!
//! An [`EngineError`] is fatal for the record in hand: the dispatcher acks
//! the message and logs it. Everything transient travels as
//! [`crate::Outcome::Retry`] instead.

use thiserror::Error;

use lfx_sync_adapters::AdapterError;
use lfx_sync_auth::AuthError;
use lfx_sync_mappers::MapError;

/// Fatal-per-record failures.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The event could not be interpreted at all.
    #[error("malformed event: {0}")]
    Malformed(String),

    /// The record carries no usable v1 identifier.
    #[error("record has no v1 id")]
    MissingId,

    /// The mapper rejected the payload.
    #[error(transparent)]
    Map(#[from] MapError),

    /// The downstream service rejected the record (4xx or undecodable).
    #[error("downstream rejected the record: {0}")]
    Downstream(#[source] AdapterError),

    /// An entity-tag conflict survived its one retry.
    #[error("entity tag conflict persisted across redeliveries")]
    EtagConflict,

    /// Token minting failed; without attribution no call can be made.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A stored mapping value could not be decoded.
    #[error("mapping value at {key} is not decodable")]
    BadMapping { key: String },
}
