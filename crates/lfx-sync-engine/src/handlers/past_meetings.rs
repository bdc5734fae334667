//! Past-meeting handlers: the meeting itself, participants (invitees and
//! attendees), recordings (with transcript artifacts), and summaries.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use lfx_sync_mappers::past_meeting;
use lfx_sync_mappings::{MappingState, forward_key};
use lfx_sync_types::{ChangeEvent, Payload, RecordKind, parent_ref, subjects};

use crate::context::SyncContext;
use crate::error::EngineError;
use crate::handlers::{
    ExtraDoc, HandlerDeps, PublishSpec, RecordHandler, live_string, publish_delete,
    publish_upsert, record_id, should_skip, try_adapter,
};
use crate::outcome::Outcome;

/// Resolves a required parent mapping with the retry policy of artifact
/// kinds: absent retries, tombstoned skips.
async fn required_parent(
    deps: &HandlerDeps,
    kind: RecordKind,
    v1_id: &str,
) -> Result<Result<String, Outcome>, EngineError> {
    let key = forward_key(kind, v1_id);
    let state = match deps.mappings.read(&key).await {
        Ok(state) => state,
        Err(err) => return Ok(Err(Outcome::Retry(err.to_string()))),
    };
    match state {
        MappingState::Absent => Ok(Err(Outcome::Retry(format!(
            "{kind} {v1_id} not mapped yet"
        )))),
        MappingState::Tombstoned => Ok(Err(Outcome::Skipped("parent deleted"))),
        state @ MappingState::Live(_) => Ok(Ok(live_string(&state, &key)?)),
    }
}

pub struct PastMeetingHandler {
    deps: Arc<HandlerDeps>,
}

impl PastMeetingHandler {
    pub fn new(deps: Arc<HandlerDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl RecordHandler for PastMeetingHandler {
    fn kind(&self) -> RecordKind {
        RecordKind::PastMeeting
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

        let Some(meeting_v1) = past_meeting::parent_meeting_id(payload) else {
            return Err(EngineError::Malformed(
                "past meeting without meeting_id".to_string(),
            ));
        };
        let meeting_uid = match required_parent(&self.deps, RecordKind::Meeting, &meeting_v1).await? {
            Ok(uid) => uid,
            Err(outcome) => return Ok(outcome),
        };

        let doc = past_meeting::past_meeting_doc(payload, &meeting_uid)?;
        publish_upsert(
            &self.deps,
            ctx,
            PublishSpec {
                kind: RecordKind::PastMeeting,
                object_type: "past_meeting",
                v1_id: id,
                parent_path: Some(meeting_v1),
                doc,
                index_subject: subjects::INDEX_PAST_MEETING,
                access_subject: subjects::UPDATE_ACCESS_PAST_MEETING,
                parent_refs: vec![parent_ref("meeting", &meeting_uid)],
                references: Some(BTreeMap::from([(
                    "meeting".to_string(),
                    vec![meeting_uid.clone()],
                )])),
                relations: None,
                extra: Vec::new(),
            },
        )
        .await
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
        publish_delete(
            &self.deps,
            ctx,
            RecordKind::PastMeeting,
            "past_meeting",
            id,
            subjects::INDEX_PAST_MEETING,
            subjects::DELETE_ALL_ACCESS_PAST_MEETING,
        )
        .await
    }
}

/// Invitees and attendees share one handler parameterized by kind; both
/// publish on the participant subjects with the role set accordingly.
pub struct ParticipantHandler {
    deps: Arc<HandlerDeps>,
    kind: RecordKind,
    role: &'static str,
}

impl ParticipantHandler {
    pub fn invitees(deps: Arc<HandlerDeps>) -> Self {
        Self {
            deps,
            kind: RecordKind::PastMeetingInvitee,
            role: "invitee",
        }
    }

    pub fn attendees(deps: Arc<HandlerDeps>) -> Self {
        Self {
            deps,
            kind: RecordKind::PastMeetingAttendee,
            role: "attendee",
        }
    }
}

#[async_trait]
impl RecordHandler for ParticipantHandler {
    fn kind(&self) -> RecordKind {
        self.kind
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

        let Some(past_v1) = past_meeting::parent_past_meeting_id(payload) else {
            return Err(EngineError::Malformed(
                "participant without past_meeting_id".to_string(),
            ));
        };
        let past_uid = match required_parent(&self.deps, RecordKind::PastMeeting, &past_v1).await? {
            Ok(uid) => uid,
            Err(outcome) => return Ok(outcome),
        };

        let doc = past_meeting::participant_doc(payload, &past_uid, self.role)?;
        let outcome = publish_upsert(
            &self.deps,
            ctx,
            PublishSpec {
                kind: self.kind,
                object_type: "past_meeting_participant",
                v1_id: id.clone(),
                parent_path: Some(past_v1),
                doc,
                index_subject: subjects::INDEX_PAST_MEETING_PARTICIPANT,
                access_subject: subjects::FGA_SYNC_UPDATE_ACCESS,
                parent_refs: vec![parent_ref("past_meeting", &past_uid)],
                references: Some(BTreeMap::from([(
                    "past_meeting".to_string(),
                    vec![past_uid.clone()],
                )])),
                relations: None,
                extra: Vec::new(),
            },
        )
        .await?;
        if outcome != Outcome::Applied {
            return Ok(outcome);
        }

        let side = json!({
            "past_meeting_uid": past_uid,
            "email": payload.str_field("email"),
            "role": self.role,
        });
        try_adapter!(
            self.deps
                .publisher
                .publish_json(subjects::PUT_PARTICIPANT_PAST_MEETING, &side)
                .await,
            ctx
        );
        info!(kind = %self.kind, v1_id = %id, "participant synced");
        Ok(Outcome::Applied)
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
        publish_delete(
            &self.deps,
            ctx,
            self.kind,
            "past_meeting_participant",
            id,
            subjects::INDEX_PAST_MEETING_PARTICIPANT,
            subjects::FGA_SYNC_UPDATE_ACCESS,
        )
        .await
    }
}

pub struct RecordingHandler {
    deps: Arc<HandlerDeps>,
}

impl RecordingHandler {
    pub fn new(deps: Arc<HandlerDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl RecordHandler for RecordingHandler {
    fn kind(&self) -> RecordKind {
        RecordKind::PastMeetingRecording
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

        let Some(past_v1) = past_meeting::parent_past_meeting_id(payload) else {
            return Err(EngineError::Malformed(
                "recording without past_meeting_id".to_string(),
            ));
        };
        let past_uid = match required_parent(&self.deps, RecordKind::PastMeeting, &past_v1).await? {
            Ok(uid) => uid,
            Err(outcome) => return Ok(outcome),
        };

        let (doc, transcript) = past_meeting::recording_doc(payload, &past_uid)?;
        let extra = transcript
            .map(|doc| {
                vec![ExtraDoc {
                    object_type: "past_meeting_transcript",
                    id_suffix: "transcript",
                    doc,
                    index_subject: subjects::INDEX_PAST_MEETING_TRANSCRIPT,
                    access_subject: subjects::UPDATE_ACCESS_PAST_MEETING_TRANSCRIPT,
                }]
            })
            .unwrap_or_default();

        publish_upsert(
            &self.deps,
            ctx,
            PublishSpec {
                kind: RecordKind::PastMeetingRecording,
                object_type: "past_meeting_recording",
                v1_id: id,
                parent_path: Some(past_v1),
                doc,
                index_subject: subjects::INDEX_PAST_MEETING_RECORDING,
                access_subject: subjects::UPDATE_ACCESS_PAST_MEETING_RECORDING,
                parent_refs: vec![parent_ref("past_meeting", &past_uid)],
                references: Some(BTreeMap::from([(
                    "past_meeting".to_string(),
                    vec![past_uid.clone()],
                )])),
                relations: None,
                extra,
            },
        )
        .await
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
        publish_delete(
            &self.deps,
            ctx,
            RecordKind::PastMeetingRecording,
            "past_meeting_recording",
            id,
            subjects::INDEX_PAST_MEETING_RECORDING,
            subjects::UPDATE_ACCESS_PAST_MEETING_RECORDING,
        )
        .await
    }
}

pub struct SummaryHandler {
    deps: Arc<HandlerDeps>,
}

impl SummaryHandler {
    pub fn new(deps: Arc<HandlerDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl RecordHandler for SummaryHandler {
    fn kind(&self) -> RecordKind {
        RecordKind::PastMeetingSummary
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

        let Some(past_v1) = past_meeting::parent_past_meeting_id(payload) else {
            return Err(EngineError::Malformed(
                "summary without past_meeting_id".to_string(),
            ));
        };
        let past_uid = match required_parent(&self.deps, RecordKind::PastMeeting, &past_v1).await? {
            Ok(uid) => uid,
            Err(outcome) => return Ok(outcome),
        };

        let doc = past_meeting::summary_doc(payload, &past_uid)?;
        publish_upsert(
            &self.deps,
            ctx,
            PublishSpec {
                kind: RecordKind::PastMeetingSummary,
                object_type: "past_meeting_summary",
                v1_id: id,
                parent_path: Some(past_v1),
                doc,
                index_subject: subjects::INDEX_PAST_MEETING_SUMMARY,
                access_subject: subjects::UPDATE_ACCESS_PAST_MEETING_SUMMARY,
                parent_refs: vec![parent_ref("past_meeting", &past_uid)],
                references: Some(BTreeMap::from([(
                    "past_meeting".to_string(),
                    vec![past_uid.clone()],
                )])),
                relations: None,
                extra: Vec::new(),
            },
        )
        .await
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
        publish_delete(
            &self.deps,
            ctx,
            RecordKind::PastMeetingSummary,
            "past_meeting_summary",
            id,
            subjects::INDEX_PAST_MEETING_SUMMARY,
            subjects::UPDATE_ACCESS_PAST_MEETING_SUMMARY,
        )
        .await
    }
}
