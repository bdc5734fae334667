//! Meeting and meeting-committee join handlers.
//!
//! Joins carry compound state: the cumulative committee set for a meeting
//! lives in a single mapping value (a JSON map keyed by per-join UUID).
//! A join event re-publishes the joined meeting with the whole set, which
//! also covers the out-of-order case where the join arrives before the
//! meeting itself has been synced.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use lfx_sync_mappers::meeting;
use lfx_sync_mappings::{
    CommitteeIndex, CommitteeIndexEntry, MappingState, committee_index_key, forward_key,
    join_compound, split_compound,
};
use lfx_sync_types::{ChangeEvent, Payload, RecordKind, parent_ref, subjects};

use crate::context::SyncContext;
use crate::error::EngineError;
use crate::handlers::{
    HandlerDeps, PublishSpec, RecordHandler, live_string, publish_delete, publish_upsert,
    record_id, should_skip, try_kv,
};
use crate::outcome::Outcome;

/// Publishes (or re-publishes) a meeting record with its cumulative
/// committee set. Shared by the meeting handler (payload from the event)
/// and the join handlers (payload hydrated from the `v1-objects` bucket).
pub(crate) async fn sync_meeting(
    deps: &HandlerDeps,
    ctx: &SyncContext,
    meeting_v1_id: &str,
    payload: &Payload,
) -> Result<Outcome, EngineError> {
    let project_v1 = meeting::parent_project_id(payload);
    let project_uid = match &project_v1 {
        None => None,
        Some(pid) => {
            let key = forward_key(RecordKind::Project, pid);
            match try_kv!(deps.mappings.read(&key).await) {
                MappingState::Absent => return Ok(Outcome::Skipped("project not mapped")),
                MappingState::Tombstoned => return Ok(Outcome::Skipped("project deleted")),
                state @ MappingState::Live(_) => Some(live_string(&state, &key)?),
            }
        }
    };

    let index_key = committee_index_key(meeting_v1_id);
    let committees = match try_kv!(deps.mappings.read(&index_key).await) {
        MappingState::Live(bytes) => CommitteeIndex::from_bytes(&bytes)
            .map_err(|_| EngineError::BadMapping {
                key: index_key.clone(),
            })?
            .committee_uids(),
        _ => Vec::new(),
    };

    let doc = meeting::meeting_doc(payload, project_uid.as_deref(), &committees)?;

    let mut parent_refs = Vec::new();
    let mut references: BTreeMap<String, Vec<String>> = BTreeMap::new();
    if let Some(uid) = &project_uid {
        parent_refs.push(parent_ref("project", uid));
        references.insert("project".to_string(), vec![uid.clone()]);
    }
    if !committees.is_empty() {
        references.insert("committee".to_string(), committees);
    }

    publish_upsert(
        deps,
        ctx,
        PublishSpec {
            kind: RecordKind::Meeting,
            object_type: "meeting",
            v1_id: meeting_v1_id.to_string(),
            parent_path: project_v1,
            doc,
            index_subject: subjects::INDEX_MEETING,
            access_subject: subjects::UPDATE_ACCESS_MEETING,
            parent_refs,
            references: (!references.is_empty()).then_some(references),
            relations: None,
            extra: Vec::new(),
        },
    )
    .await
}

pub struct MeetingHandler {
    deps: Arc<HandlerDeps>,
}

impl MeetingHandler {
    pub fn new(deps: Arc<HandlerDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl RecordHandler for MeetingHandler {
    fn kind(&self) -> RecordKind {
        RecordKind::Meeting
    }

    async fn on_put(
        &self,
        ctx: &SyncContext,
        event: &ChangeEvent,
        payload: &Payload,
    ) -> Result<Outcome, EngineError> {
        if should_skip(payload) {
            return Ok(Outcome::Skipped("sync sentinel set"));
        }
        let id = record_id(event, payload)?;
        sync_meeting(&self.deps, ctx, &id, payload).await
    }

    async fn on_delete(
        &self,
        ctx: &SyncContext,
        event: &ChangeEvent,
    ) -> Result<Outcome, EngineError> {
        let id = event.key_id();
        if id.is_empty() {
            return Err(EngineError::MissingId);
        }

        let outcome = publish_delete(
            &self.deps,
            ctx,
            RecordKind::Meeting,
            "meeting",
            id,
            subjects::INDEX_MEETING,
            subjects::DELETE_ALL_ACCESS_MEETING,
        )
        .await?;
        if outcome != Outcome::Applied {
            return Ok(outcome);
        }

        // Joins die with their meeting.
        let index_key = committee_index_key(id);
        if try_kv!(self.deps.mappings.read(&index_key).await).is_live() {
            try_kv!(self.deps.mappings.tombstone(&index_key).await);
        }
        Ok(Outcome::Applied)
    }
}

pub struct MeetingCommitteeHandler {
    deps: Arc<HandlerDeps>,
}

impl MeetingCommitteeHandler {
    pub fn new(deps: Arc<HandlerDeps>) -> Self {
        Self { deps }
    }

    /// Reads the joined meeting's current v1 record from the objects
    /// bucket, so the re-publish reflects the full record rather than the
    /// join event alone.
    async fn hydrate_meeting(&self, meeting_v1: &str) -> Result<Option<Payload>, EngineError> {
        let object_key = format!("{}.sfid.{meeting_v1}", RecordKind::Meeting.prefix());
        let bytes = match self.deps.objects.get_object(&object_key).await {
            Ok(bytes) => bytes,
            Err(_) => return Ok(None),
        };
        match bytes {
            None => Ok(None),
            Some(bytes) => Payload::from_bytes(&bytes)
                .map(Some)
                .map_err(|e| EngineError::Malformed(format!("meeting record {object_key}: {e}"))),
        }
    }
}

#[async_trait]
impl RecordHandler for MeetingCommitteeHandler {
    fn kind(&self) -> RecordKind {
        RecordKind::MeetingCommittee
    }

    async fn on_put(
        &self,
        ctx: &SyncContext,
        event: &ChangeEvent,
        payload: &Payload,
    ) -> Result<Outcome, EngineError> {
        if should_skip(payload) {
            return Ok(Outcome::Skipped("sync sentinel set"));
        }
        let join_id = record_id(event, payload)?;

        // A mapping event without its committee is a no-op, not an error.
        let Some(committee_v1) = payload.string_field("committee_id") else {
            return Ok(Outcome::Skipped("missing committee_id"));
        };
        let Some(meeting_v1) = payload.string_field("meeting_id") else {
            return Err(EngineError::Malformed("join event without meeting_id".to_string()));
        };

        let join_key = forward_key(RecordKind::MeetingCommittee, &join_id);
        if try_kv!(self.deps.mappings.read(&join_key).await).is_tombstoned() {
            return Ok(Outcome::Skipped("previously deleted"));
        }

        let committee_key = forward_key(RecordKind::Committee, &committee_v1);
        let committee_uid = match try_kv!(self.deps.mappings.read(&committee_key).await) {
            MappingState::Absent => {
                return Ok(Outcome::Retry(format!(
                    "committee {committee_v1} not mapped yet"
                )));
            }
            MappingState::Tombstoned => return Ok(Outcome::Skipped("committee deleted")),
            state @ MappingState::Live(_) => live_string(&state, &committee_key)?,
        };

        let index_key = committee_index_key(&meeting_v1);
        let mut index = match try_kv!(self.deps.mappings.read(&index_key).await) {
            MappingState::Live(bytes) => {
                CommitteeIndex::from_bytes(&bytes).map_err(|_| EngineError::BadMapping {
                    key: index_key.clone(),
                })?
            }
            MappingState::Tombstoned => return Ok(Outcome::Skipped("meeting deleted")),
            MappingState::Absent => CommitteeIndex::new(),
        };
        index.upsert(CommitteeIndexEntry {
            committee_uid: committee_uid.clone(),
            filters: payload.string_list("voting_filters"),
        });
        try_kv!(self.deps.mappings.put_bytes(&index_key, index.to_bytes()).await);

        let Some(meeting_payload) = self.hydrate_meeting(&meeting_v1).await? else {
            return Ok(Outcome::Retry(format!(
                "meeting {meeting_v1} not replicated yet"
            )));
        };

        let outcome = sync_meeting(&self.deps, ctx, &meeting_v1, &meeting_payload).await?;
        if outcome != Outcome::Applied {
            return Ok(outcome);
        }

        try_kv!(
            self.deps
                .mappings
                .put(&join_key, &join_compound(&meeting_v1, &committee_uid))
                .await
        );
        info!(
            kind = "meeting_committees",
            v1_id = %join_id,
            meeting = %meeting_v1,
            committee = %committee_uid,
            "meeting committee set updated"
        );
        Ok(Outcome::Applied)
    }

    async fn on_delete(
        &self,
        ctx: &SyncContext,
        event: &ChangeEvent,
    ) -> Result<Outcome, EngineError> {
        let join_id = event.key_id();
        if join_id.is_empty() {
            return Err(EngineError::MissingId);
        }

        let join_key = forward_key(RecordKind::MeetingCommittee, join_id);
        let state = try_kv!(self.deps.mappings.read(&join_key).await);
        let stored = match &state {
            MappingState::Absent | MappingState::Tombstoned => return Ok(Outcome::Applied),
            MappingState::Live(_) => live_string(&state, &join_key)?,
        };
        let (meeting_v1, committee_uid) = match split_compound(&stored) {
            (Some(meeting_v1), committee_uid) => (meeting_v1.to_string(), committee_uid),
            (None, _) => {
                return Err(EngineError::BadMapping { key: join_key });
            }
        };

        let index_key = committee_index_key(&meeting_v1);
        if let MappingState::Live(bytes) = try_kv!(self.deps.mappings.read(&index_key).await) {
            let mut index =
                CommitteeIndex::from_bytes(&bytes).map_err(|_| EngineError::BadMapping {
                    key: index_key.clone(),
                })?;
            if index.remove_committee(committee_uid) {
                try_kv!(self.deps.mappings.put_bytes(&index_key, index.to_bytes()).await);
            }
        }

        // Re-publish the meeting with the reduced set when it is still
        // live and its record is still around.
        let meeting_key = forward_key(RecordKind::Meeting, &meeting_v1);
        if try_kv!(self.deps.mappings.read(&meeting_key).await).is_live() {
            if let Some(meeting_payload) = self.hydrate_meeting(&meeting_v1).await? {
                let outcome = sync_meeting(&self.deps, ctx, &meeting_v1, &meeting_payload).await?;
                if outcome.is_retry() {
                    return Ok(outcome);
                }
            } else {
                debug!(meeting = %meeting_v1, "meeting record gone, skipping re-publish");
            }
        }

        try_kv!(self.deps.mappings.tombstone(&join_key).await);
        Ok(Outcome::Applied)
    }
}
