//! # lfx-sync-types: Core types for the LFX v1 sync worker
//!
//! This crate contains the shared vocabulary used across the sync pipeline:
//! - Record kinds and their bucket key prefixes ([`RecordKind`])
//! - Change events decoded from the KV change stream ([`ChangeEvent`], [`KvOperation`])
//! - Dynamic v1 payload access with explicit coercion ([`Payload`])
//! - Outbound message schemas ([`IndexerEnvelope`], [`AccessEnvelope`])
//! - The fixed publish subject table ([`subjects`])

mod envelope;
mod event;
mod kind;
mod payload;
pub mod subjects;

pub use envelope::{
    AccessData, AccessEnvelope, EnvelopeHeaders, IndexAction, IndexerEnvelope, IndexingConfig,
    parent_ref,
};
pub use event::{ChangeEvent, EventError, KvOperation};
pub use kind::RecordKind;
pub use payload::Payload;
