//! Meeting registrant and invite-response handlers.
//!
//! Registrants publish the index/access pair plus put/remove-registrant
//! side messages that keep the meeting service's attendee list current.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use lfx_sync_mappers::registrant;
use lfx_sync_mappings::{MappingState, forward_key, reverse_key, split_compound};
use lfx_sync_types::{ChangeEvent, Payload, RecordKind, parent_ref, subjects};

use crate::context::SyncContext;
use crate::error::EngineError;
use crate::handlers::{
    HandlerDeps, PublishSpec, RecordHandler, live_string, publish_delete, publish_upsert,
    record_id, should_skip, try_adapter, try_kv,
};
use crate::outcome::Outcome;

/// Resolves the required parent meeting: absent retries, tombstoned skips.
async fn parent_meeting_uid(
    deps: &HandlerDeps,
    meeting_v1: &str,
) -> Result<Result<String, Outcome>, EngineError> {
    let key = forward_key(RecordKind::Meeting, meeting_v1);
    let state = match deps.mappings.read(&key).await {
        Ok(state) => state,
        Err(err) => return Ok(Err(Outcome::Retry(err.to_string()))),
    };
    match state {
        MappingState::Absent => Ok(Err(Outcome::Retry(format!(
            "meeting {meeting_v1} not mapped yet"
        )))),
        MappingState::Tombstoned => Ok(Err(Outcome::Skipped("meeting deleted"))),
        state @ MappingState::Live(_) => Ok(Ok(live_string(&state, &key)?)),
    }
}

pub struct MeetingRegistrantHandler {
    deps: Arc<HandlerDeps>,
}

impl MeetingRegistrantHandler {
    pub fn new(deps: Arc<HandlerDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl RecordHandler for MeetingRegistrantHandler {
    fn kind(&self) -> RecordKind {
        RecordKind::MeetingRegistrant
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

        let Some(meeting_v1) = registrant::parent_meeting_id(payload) else {
            return Err(EngineError::Malformed(
                "registrant without meeting_id".to_string(),
            ));
        };
        let meeting_uid = match parent_meeting_uid(&self.deps, &meeting_v1).await? {
            Ok(uid) => uid,
            Err(outcome) => return Ok(outcome),
        };

        let doc = registrant::registrant_doc(payload, &meeting_uid)?;
        let relations = registrant::registrant_subject(payload)
            .map(|subject| BTreeMap::from([("participant".to_string(), vec![subject])]));

        let outcome = publish_upsert(
            &self.deps,
            ctx,
            PublishSpec {
                kind: RecordKind::MeetingRegistrant,
                object_type: "meeting_registrant",
                v1_id: id.clone(),
                parent_path: Some(meeting_v1),
                doc,
                index_subject: subjects::INDEX_MEETING_REGISTRANT,
                access_subject: subjects::FGA_SYNC_UPDATE_ACCESS,
                parent_refs: vec![parent_ref("meeting", &meeting_uid)],
                references: Some(BTreeMap::from([(
                    "meeting".to_string(),
                    vec![meeting_uid.clone()],
                )])),
                relations,
                extra: Vec::new(),
            },
        )
        .await?;
        if outcome != Outcome::Applied {
            return Ok(outcome);
        }

        // Keep the meeting service's attendee roster in step.
        let side = json!({
            "meeting_uid": meeting_uid,
            "email": payload.str_field("email"),
            "username": payload.str_field("username"),
            "occurrence_id": payload.str_field("occurrence_id"),
            "host": payload.bool_field("host").unwrap_or(false),
        });
        try_adapter!(
            self.deps
                .publisher
                .publish_json(subjects::PUT_REGISTRANT_MEETING, &side)
                .await,
            ctx
        );
        info!(kind = "meeting_registrant", v1_id = %id, "registrant synced");
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

        let fwd_key = forward_key(RecordKind::MeetingRegistrant, id);
        let state = try_kv!(self.deps.mappings.read(&fwd_key).await);
        let uid = match &state {
            MappingState::Absent | MappingState::Tombstoned => return Ok(Outcome::Applied),
            MappingState::Live(_) => live_string(&state, &fwd_key)?,
        };

        // Correlate back to the meeting through the reverse mapping before
        // the tombstones land.
        let reverse = try_kv!(
            self.deps
                .mappings
                .read(&reverse_key(RecordKind::MeetingRegistrant, &uid))
                .await
        );
        let meeting_uid = match reverse.live_str().map(split_compound) {
            Some((Some(meeting_v1), _)) => {
                let key = forward_key(RecordKind::Meeting, meeting_v1);
                try_kv!(self.deps.mappings.read(&key).await)
                    .live_str()
                    .map(str::to_string)
            }
            _ => None,
        };

        if let Some(meeting_uid) = &meeting_uid {
            let side = json!({
                "meeting_uid": meeting_uid,
                "registrant_uid": uid,
            });
            try_adapter!(
                self.deps
                    .publisher
                    .publish_json(subjects::REMOVE_REGISTRANT_MEETING, &side)
                    .await,
                ctx
            );
        }

        publish_delete(
            &self.deps,
            ctx,
            RecordKind::MeetingRegistrant,
            "meeting_registrant",
            id,
            subjects::INDEX_MEETING_REGISTRANT,
            subjects::FGA_SYNC_UPDATE_ACCESS,
        )
        .await
    }
}

pub struct MeetingRsvpHandler {
    deps: Arc<HandlerDeps>,
}

impl MeetingRsvpHandler {
    pub fn new(deps: Arc<HandlerDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl RecordHandler for MeetingRsvpHandler {
    fn kind(&self) -> RecordKind {
        RecordKind::MeetingRsvp
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

        let Some(meeting_v1) = registrant::parent_meeting_id(payload) else {
            return Err(EngineError::Malformed("rsvp without meeting_id".to_string()));
        };
        let meeting_uid = match parent_meeting_uid(&self.deps, &meeting_v1).await? {
            Ok(uid) => uid,
            Err(outcome) => return Ok(outcome),
        };

        let doc = registrant::rsvp_doc(payload, &meeting_uid)?;
        publish_upsert(
            &self.deps,
            ctx,
            PublishSpec {
                kind: RecordKind::MeetingRsvp,
                object_type: "meeting_rsvp",
                v1_id: id,
                parent_path: Some(meeting_v1),
                doc,
                index_subject: subjects::INDEX_MEETING_RSVP,
                access_subject: subjects::FGA_SYNC_UPDATE_ACCESS,
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
            RecordKind::MeetingRsvp,
            "meeting_rsvp",
            id,
            subjects::INDEX_MEETING_RSVP,
            subjects::FGA_SYNC_UPDATE_ACCESS,
        )
        .await
    }
}
