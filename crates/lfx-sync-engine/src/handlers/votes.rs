//! Vote and vote-response handlers.
//!
//! Votes require their project (skip when unmapped — vote creation is not
//! guarded upstream either) and optionally scope to a committee, whose
//! mapping is injected when live.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use lfx_sync_mappers::vote;
use lfx_sync_mappings::{MappingState, forward_key};
use lfx_sync_types::{ChangeEvent, Payload, RecordKind, parent_ref, subjects};

use crate::context::SyncContext;
use crate::error::EngineError;
use crate::handlers::{
    HandlerDeps, PublishSpec, RecordHandler, live_string, publish_delete, publish_upsert,
    record_id, should_skip,
};
use crate::outcome::Outcome;

/// Resolved vote parents: required project, optional committee.
struct VoteParents {
    project_v1: String,
    project_uid: String,
    committee_uid: Option<String>,
}

async fn resolve_vote_parents(
    deps: &HandlerDeps,
    payload: &Payload,
) -> Result<Result<VoteParents, Outcome>, EngineError> {
    let Some(project_v1) = vote::parent_project_id(payload) else {
        return Ok(Err(Outcome::Skipped("vote without project")));
    };
    let project_key = forward_key(RecordKind::Project, &project_v1);
    let project_state = match deps.mappings.read(&project_key).await {
        Ok(state) => state,
        Err(err) => return Ok(Err(Outcome::Retry(err.to_string()))),
    };
    let project_uid = match project_state {
        MappingState::Absent => return Ok(Err(Outcome::Skipped("project not mapped"))),
        MappingState::Tombstoned => return Ok(Err(Outcome::Skipped("project deleted"))),
        state @ MappingState::Live(_) => live_string(&state, &project_key)?,
    };

    // Optional committee: injected when live, ignored otherwise.
    let committee_uid = match vote::parent_committee_id(payload) {
        None => None,
        Some(cid) => {
            let key = forward_key(RecordKind::Committee, &cid);
            match deps.mappings.read(&key).await {
                Ok(state @ MappingState::Live(_)) => Some(live_string(&state, &key)?),
                Ok(_) => None,
                Err(err) => return Ok(Err(Outcome::Retry(err.to_string()))),
            }
        }
    };

    Ok(Ok(VoteParents {
        project_v1,
        project_uid,
        committee_uid,
    }))
}

fn vote_refs(parents: &VoteParents) -> (Vec<String>, BTreeMap<String, Vec<String>>) {
    let mut parent_refs = vec![parent_ref("project", &parents.project_uid)];
    let mut references = BTreeMap::from([(
        "project".to_string(),
        vec![parents.project_uid.clone()],
    )]);
    if let Some(committee_uid) = &parents.committee_uid {
        parent_refs.push(parent_ref("committee", committee_uid));
        references.insert("committee".to_string(), vec![committee_uid.clone()]);
    }
    (parent_refs, references)
}

pub struct VoteHandler {
    deps: Arc<HandlerDeps>,
}

impl VoteHandler {
    pub fn new(deps: Arc<HandlerDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl RecordHandler for VoteHandler {
    fn kind(&self) -> RecordKind {
        RecordKind::Vote
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

        let parents = match resolve_vote_parents(&self.deps, payload).await? {
            Ok(parents) => parents,
            Err(outcome) => return Ok(outcome),
        };

        let doc = vote::vote_doc(payload, &parents.project_uid, parents.committee_uid.as_deref())?;
        let (parent_refs, references) = vote_refs(&parents);

        publish_upsert(
            &self.deps,
            ctx,
            PublishSpec {
                kind: RecordKind::Vote,
                object_type: "vote",
                v1_id: id,
                parent_path: Some(parents.project_v1),
                doc,
                index_subject: subjects::INDEX_VOTE,
                access_subject: subjects::FGA_SYNC_UPDATE_ACCESS,
                parent_refs,
                references: Some(references),
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
            RecordKind::Vote,
            "vote",
            id,
            subjects::INDEX_VOTE,
            subjects::FGA_SYNC_UPDATE_ACCESS,
        )
        .await
    }
}

pub struct VoteResponseHandler {
    deps: Arc<HandlerDeps>,
}

impl VoteResponseHandler {
    pub fn new(deps: Arc<HandlerDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl RecordHandler for VoteResponseHandler {
    fn kind(&self) -> RecordKind {
        RecordKind::VoteResponse
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

        let parents = match resolve_vote_parents(&self.deps, payload).await? {
            Ok(parents) => parents,
            Err(outcome) => return Ok(outcome),
        };

        let doc = vote::vote_response_doc(
            payload,
            &parents.project_uid,
            parents.committee_uid.as_deref(),
        )?;
        let (parent_refs, references) = vote_refs(&parents);

        publish_upsert(
            &self.deps,
            ctx,
            PublishSpec {
                kind: RecordKind::VoteResponse,
                object_type: "vote_response",
                v1_id: id,
                parent_path: Some(parents.project_v1),
                doc,
                index_subject: subjects::INDEX_VOTE_RESPONSE,
                access_subject: subjects::FGA_SYNC_UPDATE_ACCESS,
                parent_refs,
                references: Some(references),
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
            RecordKind::VoteResponse,
            "vote_response",
            id,
            subjects::INDEX_VOTE_RESPONSE,
            subjects::FGA_SYNC_UPDATE_ACCESS,
        )
        .await
    }
}
