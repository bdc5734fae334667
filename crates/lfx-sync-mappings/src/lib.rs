//! v1↔v2 identifier mapping store.
//!
//! The mapping bucket correlates updates and deletes across the two
//! systems. Every live forward mapping (`{kind}.sfid.{v1id}` → v2 id) is
//! paired with a live reverse mapping (`{kind}.uid.{v2id}` → v1 path), and
//! deletes tombstone both. Tombstones are permanent: a tombstoned key is
//! never revived, and a later put for the same v1 id is silently ignored.

mod committee_index;
mod keys;
mod store;

pub use committee_index::{CommitteeIndex, CommitteeIndexEntry};
pub use keys::{
    committee_index_key, forward_key, join_compound, reverse_key, reverse_value, split_compound,
};
pub use store::{
    KvMappingBackend, MappingBackend, MappingState, MappingStore, MemoryMappingBackend, TOMBSTONE,
};
