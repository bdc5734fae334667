//! Compound mapping values for meeting↔committee joins.
//!
//! A meeting's committee mapping is a JSON map keyed by a per-join UUID;
//! each entry carries the joined committee's v2 id and its voting filter
//! list. Joins accumulate: a second join for the same meeting extends the
//! map, and the meeting is re-published with the cumulative committee set.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One joined committee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeIndexEntry {
    pub committee_uid: String,
    #[serde(default)]
    pub filters: Vec<String>,
}

/// The cumulative committee set for one meeting, keyed by join UUID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeIndex(BTreeMap<String, CommitteeIndexEntry>);

impl CommitteeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(serde_json::to_vec(self).expect("committee index serializes"))
    }

    /// Adds a join, reusing the existing entry key when the committee is
    /// already present so replays do not grow the map.
    pub fn upsert(&mut self, entry: CommitteeIndexEntry) {
        if let Some((key, _)) = self
            .0
            .iter()
            .find(|(_, existing)| existing.committee_uid == entry.committee_uid)
        {
            let key = key.clone();
            self.0.insert(key, entry);
        } else {
            self.0.insert(Uuid::new_v4().to_string(), entry);
        }
    }

    /// Removes a committee's entry. Returns whether anything was removed.
    pub fn remove_committee(&mut self, committee_uid: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|_, entry| entry.committee_uid != committee_uid);
        self.0.len() != before
    }

    pub fn contains_committee(&self, committee_uid: &str) -> bool {
        self.0.values().any(|entry| entry.committee_uid == committee_uid)
    }

    /// The cumulative committee v2 ids, sorted for stable output.
    pub fn committee_uids(&self) -> Vec<String> {
        let mut uids: Vec<String> = self.0.values().map(|e| e.committee_uid.clone()).collect();
        uids.sort();
        uids.dedup();
        uids
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(uid: &str) -> CommitteeIndexEntry {
        CommitteeIndexEntry {
            committee_uid: uid.to_string(),
            filters: vec![],
        }
    }

    #[test]
    fn joins_accumulate() {
        let mut index = CommitteeIndex::new();
        index.upsert(entry("C1"));
        index.upsert(entry("C2"));

        assert_eq!(index.committee_uids(), vec!["C1".to_string(), "C2".to_string()]);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn replayed_join_does_not_grow_the_map() {
        let mut index = CommitteeIndex::new();
        index.upsert(entry("C1"));
        index.upsert(CommitteeIndexEntry {
            committee_uid: "C1".to_string(),
            filters: vec!["voting".to_string()],
        });

        assert_eq!(index.len(), 1);
        assert!(index.contains_committee("C1"));
    }

    #[test]
    fn remove_committee_drops_all_entries() {
        let mut index = CommitteeIndex::new();
        index.upsert(entry("C1"));
        index.upsert(entry("C2"));

        assert!(index.remove_committee("C1"));
        assert!(!index.remove_committee("C1"));
        assert_eq!(index.committee_uids(), vec!["C2".to_string()]);
    }

    #[test]
    fn bytes_round_trip() {
        let mut index = CommitteeIndex::new();
        index.upsert(CommitteeIndexEntry {
            committee_uid: "C1".to_string(),
            filters: vec!["voting".to_string()],
        });

        let decoded = CommitteeIndex::from_bytes(&index.to_bytes()).unwrap();
        assert_eq!(decoded, index);
    }
}
