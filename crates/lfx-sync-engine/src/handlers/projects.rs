//! Project handler: REST upserts against the v2 project service.
//!
//! Projects are hierarchical; a record naming a parent project waits
//! (retry) until the parent's mapping exists, and skips once the parent
//! is tombstoned.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use lfx_sync_mappers::project;
use lfx_sync_mappings::{MappingState, forward_key};
use lfx_sync_types::{ChangeEvent, Payload, RecordKind};

use crate::context::{AUD_PROJECT, SyncContext};
use crate::error::EngineError;
use crate::handlers::{
    HandlerDeps, RecordHandler, envelope_value, live_string, record_id, should_skip,
    tombstone_pair, try_adapter, try_kv, write_mapping_pair,
};
use crate::outcome::Outcome;

pub struct ProjectHandler {
    deps: Arc<HandlerDeps>,
}

impl ProjectHandler {
    pub fn new(deps: Arc<HandlerDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl RecordHandler for ProjectHandler {
    fn kind(&self) -> RecordKind {
        RecordKind::Project
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

        // Parent project: wait for it unless it was deleted.
        let parent_v1 = project::parent_project_id(payload);
        let parent_uid = match &parent_v1 {
            None => None,
            Some(pid) => {
                let key = forward_key(RecordKind::Project, pid);
                match try_kv!(self.deps.mappings.read(&key).await) {
                    MappingState::Absent => {
                        return Ok(Outcome::Retry(format!("parent project {pid} not mapped yet")));
                    }
                    MappingState::Tombstoned => {
                        return Ok(Outcome::Skipped("parent project deleted"));
                    }
                    state @ MappingState::Live(_) => Some(live_string(&state, &key)?),
                }
            }
        };

        let fwd_key = forward_key(RecordKind::Project, &id);
        let state = try_kv!(self.deps.mappings.read(&fwd_key).await);
        if state.is_tombstoned() {
            return Ok(Outcome::Skipped("previously deleted"));
        }

        let body = project::project_payload(payload, parent_uid.as_deref())?;
        let body_value = envelope_value(&body)?;
        let token = self.deps.bearer(ctx, AUD_PROJECT).await?;

        if state.is_live() {
            let uid = live_string(&state, &fwd_key)?;
            let fetched = try_adapter!(self.deps.projects.get(&token, &uid).await, ctx);
            if !body.differs_from(&fetched.body) {
                debug!(kind = "project", v1_id = %id, "no base change, update skipped");
                return Ok(Outcome::Applied);
            }
            try_adapter!(
                self.deps
                    .projects
                    .update(&token, &uid, &fetched.etag, &body_value)
                    .await,
                ctx
            );
            try_kv!(
                write_mapping_pair(
                    &self.deps,
                    RecordKind::Project,
                    &id,
                    &uid,
                    parent_v1.as_deref(),
                )
                .await
            );
            info!(kind = "project", v1_id = %id, v2_uid = %uid, "project updated");
        } else {
            let created = try_adapter!(self.deps.projects.create(&token, &body_value).await, ctx);
            try_kv!(
                write_mapping_pair(
                    &self.deps,
                    RecordKind::Project,
                    &id,
                    &created.uid,
                    parent_v1.as_deref(),
                )
                .await
            );
            info!(kind = "project", v1_id = %id, v2_uid = %created.uid, "project created");
        }
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

        let fwd_key = forward_key(RecordKind::Project, id);
        let state = try_kv!(self.deps.mappings.read(&fwd_key).await);
        let uid = match &state {
            MappingState::Absent | MappingState::Tombstoned => return Ok(Outcome::Applied),
            MappingState::Live(_) => live_string(&state, &fwd_key)?,
        };

        let token = self.deps.bearer(ctx, AUD_PROJECT).await?;
        try_adapter!(self.deps.projects.delete(&token, &uid, None).await, ctx);
        try_kv!(tombstone_pair(&self.deps, RecordKind::Project, id, &uid).await);
        info!(kind = "project", v1_id = %id, v2_uid = %uid, "project deleted");
        Ok(Outcome::Applied)
    }
}
