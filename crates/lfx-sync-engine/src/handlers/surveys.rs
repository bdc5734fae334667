//! Survey and survey-response handlers. Parents are injected best-effort:
//! whichever of survey, project, and committee resolve to live mappings
//! get carried; nothing retries or skips on their absence.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use lfx_sync_mappers::survey::{self, SurveyRefs};
use lfx_sync_mappings::{MappingState, forward_key};
use lfx_sync_types::{ChangeEvent, Payload, RecordKind, parent_ref, subjects};

use crate::context::SyncContext;
use crate::error::EngineError;
use crate::handlers::{
    HandlerDeps, PublishSpec, RecordHandler, live_string, publish_delete, publish_upsert,
    record_id, should_skip,
};
use crate::outcome::Outcome;

/// Best-effort mapping read: live values resolve, everything else is
/// `None`, broker failures retry.
async fn best_effort_uid(
    deps: &HandlerDeps,
    kind: RecordKind,
    v1_id: Option<String>,
) -> Result<Result<Option<String>, Outcome>, EngineError> {
    let Some(v1_id) = v1_id else {
        return Ok(Ok(None));
    };
    let key = forward_key(kind, &v1_id);
    match deps.mappings.read(&key).await {
        Ok(state @ MappingState::Live(_)) => Ok(Ok(Some(live_string(&state, &key)?))),
        Ok(_) => Ok(Ok(None)),
        Err(err) => Ok(Err(Outcome::Retry(err.to_string()))),
    }
}

async fn resolve_survey_refs(
    deps: &HandlerDeps,
    payload: &Payload,
    include_survey: bool,
) -> Result<Result<SurveyRefs, Outcome>, EngineError> {
    let survey_uid = if include_survey {
        match best_effort_uid(deps, RecordKind::Survey, survey::parent_survey_id(payload)).await? {
            Ok(uid) => uid,
            Err(outcome) => return Ok(Err(outcome)),
        }
    } else {
        None
    };
    let project_uid =
        match best_effort_uid(deps, RecordKind::Project, survey::parent_project_id(payload)).await? {
            Ok(uid) => uid,
            Err(outcome) => return Ok(Err(outcome)),
        };
    let committee_uid = match best_effort_uid(
        deps,
        RecordKind::Committee,
        survey::parent_committee_id(payload),
    )
    .await?
    {
        Ok(uid) => uid,
        Err(outcome) => return Ok(Err(outcome)),
    };

    Ok(Ok(SurveyRefs {
        survey_uid,
        project_uid,
        committee_uid,
    }))
}

/// Parent refs in declared order: survey, project, committee.
fn survey_parent_refs(refs: &SurveyRefs) -> (Vec<String>, Option<BTreeMap<String, Vec<String>>>) {
    let mut parent_refs = Vec::new();
    let mut references: BTreeMap<String, Vec<String>> = BTreeMap::new();
    if let Some(uid) = &refs.survey_uid {
        parent_refs.push(parent_ref("survey", uid));
        references.insert("survey".to_string(), vec![uid.clone()]);
    }
    if let Some(uid) = &refs.project_uid {
        parent_refs.push(parent_ref("project", uid));
        references.insert("project".to_string(), vec![uid.clone()]);
    }
    if let Some(uid) = &refs.committee_uid {
        parent_refs.push(parent_ref("committee", uid));
        references.insert("committee".to_string(), vec![uid.clone()]);
    }
    let references = (!references.is_empty()).then_some(references);
    (parent_refs, references)
}

pub struct SurveyHandler {
    deps: Arc<HandlerDeps>,
}

impl SurveyHandler {
    pub fn new(deps: Arc<HandlerDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl RecordHandler for SurveyHandler {
    fn kind(&self) -> RecordKind {
        RecordKind::Survey
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

        let refs = match resolve_survey_refs(&self.deps, payload, false).await? {
            Ok(refs) => refs,
            Err(outcome) => return Ok(outcome),
        };
        let doc = survey::survey_doc(payload, &refs)?;
        let (parent_refs, references) = survey_parent_refs(&refs);

        publish_upsert(
            &self.deps,
            ctx,
            PublishSpec {
                kind: RecordKind::Survey,
                object_type: "survey",
                v1_id: id,
                parent_path: survey::parent_project_id(payload),
                doc,
                index_subject: subjects::INDEX_SURVEY,
                access_subject: subjects::FGA_SYNC_UPDATE_ACCESS,
                parent_refs,
                references,
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
            RecordKind::Survey,
            "survey",
            id,
            subjects::INDEX_SURVEY,
            subjects::FGA_SYNC_UPDATE_ACCESS,
        )
        .await
    }
}

pub struct SurveyResponseHandler {
    deps: Arc<HandlerDeps>,
}

impl SurveyResponseHandler {
    pub fn new(deps: Arc<HandlerDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl RecordHandler for SurveyResponseHandler {
    fn kind(&self) -> RecordKind {
        RecordKind::SurveyResponse
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

        let refs = match resolve_survey_refs(&self.deps, payload, true).await? {
            Ok(refs) => refs,
            Err(outcome) => return Ok(outcome),
        };
        let doc = survey::survey_response_doc(payload, &refs)?;
        let (parent_refs, references) = survey_parent_refs(&refs);

        publish_upsert(
            &self.deps,
            ctx,
            PublishSpec {
                kind: RecordKind::SurveyResponse,
                object_type: "survey_response",
                v1_id: id,
                parent_path: survey::parent_survey_id(payload),
                doc,
                index_subject: subjects::INDEX_SURVEY_RESPONSE,
                access_subject: subjects::FGA_SYNC_UPDATE_ACCESS,
                parent_refs,
                references,
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
            RecordKind::SurveyResponse,
            "survey_response",
            id,
            subjects::INDEX_SURVEY_RESPONSE,
            subjects::FGA_SYNC_UPDATE_ACCESS,
        )
        .await
    }
}
