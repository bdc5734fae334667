//! Three-state mapping reads and tombstone writes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use lfx_sync_broker::{BrokerError, KvBucket};

/// The tombstone sentinel. A single NUL byte: live values are v2 ids or
/// JSON, neither of which can be this sequence.
pub const TOMBSTONE: &[u8] = &[0x00];

/// Result of a three-state mapping read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingState {
    /// A live value: raw bytes, guaranteed not to be the sentinel.
    Live(Bytes),
    /// The key was deleted and must never be revived.
    Tombstoned,
    /// The key has never been written.
    Absent,
}

impl MappingState {
    pub fn is_live(&self) -> bool {
        matches!(self, MappingState::Live(_))
    }

    pub fn is_tombstoned(&self) -> bool {
        matches!(self, MappingState::Tombstoned)
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, MappingState::Absent)
    }

    /// The live value as UTF-8, if this state is live.
    pub fn live_str(&self) -> Option<&str> {
        match self {
            MappingState::Live(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }
}

/// Storage behind the mapping store. The production backend is the
/// `v1-mappings` KV bucket; engine tests use the in-memory backend.
#[async_trait]
pub trait MappingBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, BrokerError>;
    async fn put(&self, key: &str, value: Bytes) -> Result<(), BrokerError>;
}

/// KV-bucket backend.
pub struct KvMappingBackend {
    bucket: KvBucket,
}

impl KvMappingBackend {
    pub fn new(bucket: KvBucket) -> Self {
        Self { bucket }
    }
}

#[async_trait]
impl MappingBackend for KvMappingBackend {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, BrokerError> {
        self.bucket.get(key).await
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<(), BrokerError> {
        self.bucket.put(key, value).await.map(|_revision| ())
    }
}

/// In-memory backend for tests.
#[derive(Default)]
pub struct MemoryMappingBackend {
    entries: Mutex<HashMap<String, Bytes>>,
}

impl MemoryMappingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the raw entries, for assertions.
    pub fn entries(&self) -> HashMap<String, Bytes> {
        self.entries.lock().expect("mapping backend lock").clone()
    }
}

#[async_trait]
impl MappingBackend for MemoryMappingBackend {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, BrokerError> {
        Ok(self
            .entries
            .lock()
            .expect("mapping backend lock")
            .get(key)
            .cloned())
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<(), BrokerError> {
        self.entries
            .lock()
            .expect("mapping backend lock")
            .insert(key.to_string(), value);
        Ok(())
    }
}

/// The mapping store.
///
/// No compare-and-swap: concurrent writers of the same key are acceptable
/// because values for a given v1 id converge once a v2 id is assigned.
#[derive(Clone)]
pub struct MappingStore {
    backend: Arc<dyn MappingBackend>,
}

impl MappingStore {
    pub fn new(backend: Arc<dyn MappingBackend>) -> Self {
        Self { backend }
    }

    /// Distinguishes the tombstone sentinel from live bytes.
    pub fn is_tombstone(bytes: &[u8]) -> bool {
        bytes == TOMBSTONE
    }

    /// Three-state read.
    pub async fn read(&self, key: &str) -> Result<MappingState, BrokerError> {
        match self.backend.get(key).await? {
            None => Ok(MappingState::Absent),
            Some(bytes) if Self::is_tombstone(&bytes) => Ok(MappingState::Tombstoned),
            Some(bytes) => Ok(MappingState::Live(bytes)),
        }
    }

    /// Writes a live value. Writing the sentinel through this path is a
    /// programming error; use [`Self::tombstone`].
    pub async fn put(&self, key: &str, value: &str) -> Result<(), BrokerError> {
        debug_assert!(!Self::is_tombstone(value.as_bytes()));
        debug!(key, value, "mapping put");
        self.backend
            .put(key, Bytes::copy_from_slice(value.as_bytes()))
            .await
    }

    /// Writes raw live bytes (compound JSON values).
    pub async fn put_bytes(&self, key: &str, value: Bytes) -> Result<(), BrokerError> {
        debug_assert!(!Self::is_tombstone(&value));
        debug!(key, "mapping put (raw)");
        self.backend.put(key, value).await
    }

    /// Marks a key permanently deleted. Idempotent.
    pub async fn tombstone(&self, key: &str) -> Result<(), BrokerError> {
        debug!(key, "mapping tombstone");
        self.backend.put(key, Bytes::from_static(TOMBSTONE)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MappingStore {
        MappingStore::new(Arc::new(MemoryMappingBackend::new()))
    }

    #[tokio::test]
    async fn absent_until_written() {
        let store = store();
        assert_eq!(store.read("project.sfid.P1").await.unwrap(), MappingState::Absent);
    }

    #[tokio::test]
    async fn live_round_trip() {
        let store = store();
        store.put("project.sfid.P1", "U1").await.unwrap();

        let state = store.read("project.sfid.P1").await.unwrap();
        assert_eq!(state.live_str(), Some("U1"));
        assert!(state.is_live());
    }

    #[tokio::test]
    async fn tombstone_shadows_live_value() {
        let store = store();
        store.put("project.sfid.P1", "U1").await.unwrap();
        store.tombstone("project.sfid.P1").await.unwrap();

        assert!(store.read("project.sfid.P1").await.unwrap().is_tombstoned());
    }

    #[tokio::test]
    async fn tombstone_is_idempotent() {
        let store = store();
        store.tombstone("project.sfid.P1").await.unwrap();
        store.tombstone("project.sfid.P1").await.unwrap();

        assert!(store.read("project.sfid.P1").await.unwrap().is_tombstoned());
    }

    #[test]
    fn sentinel_detection() {
        assert!(MappingStore::is_tombstone(&[0x00]));
        assert!(!MappingStore::is_tombstone(b"U1"));
        assert!(!MappingStore::is_tombstone(b""));
        assert!(!MappingStore::is_tombstone(&[0x00, 0x00]));
    }
}
