//! Committee handler: REST upserts against the v2 committee service.
//!
//! Committee creation is unguarded upstream, so a missing project mapping
//! skips rather than retries — waiting would leave permanently orphaned
//! records cycling through redeliveries.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use lfx_sync_mappers::committee;
use lfx_sync_mappings::{MappingState, forward_key};
use lfx_sync_types::{ChangeEvent, Payload, RecordKind};

use crate::context::{AUD_COMMITTEE, SyncContext};
use crate::error::EngineError;
use crate::handlers::{
    HandlerDeps, RecordHandler, envelope_value, live_string, record_id, should_skip,
    tombstone_pair, try_adapter, try_kv, write_mapping_pair,
};
use crate::outcome::Outcome;

pub struct CommitteeHandler {
    deps: Arc<HandlerDeps>,
}

impl CommitteeHandler {
    pub fn new(deps: Arc<HandlerDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl RecordHandler for CommitteeHandler {
    fn kind(&self) -> RecordKind {
        RecordKind::Committee
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

        let Some(project_v1) = committee::parent_project_id(payload) else {
            return Ok(Outcome::Skipped("committee without project"));
        };
        let project_key = forward_key(RecordKind::Project, &project_v1);
        let project_uid = match try_kv!(self.deps.mappings.read(&project_key).await) {
            MappingState::Absent => return Ok(Outcome::Skipped("project not mapped")),
            MappingState::Tombstoned => return Ok(Outcome::Skipped("project deleted")),
            state @ MappingState::Live(_) => live_string(&state, &project_key)?,
        };

        let fwd_key = forward_key(RecordKind::Committee, &id);
        let state = try_kv!(self.deps.mappings.read(&fwd_key).await);
        if state.is_tombstoned() {
            return Ok(Outcome::Skipped("previously deleted"));
        }

        let body = committee::committee_payload(payload, &project_uid)?;
        let body_value = envelope_value(&body)?;
        let token = self.deps.bearer(ctx, AUD_COMMITTEE).await?;

        if state.is_live() {
            let uid = live_string(&state, &fwd_key)?;
            let fetched =
                try_adapter!(self.deps.committees.get_committee(&token, &uid).await, ctx);
            if !body.differs_from(&fetched.body) {
                debug!(kind = "committee", v1_id = %id, "no base change, update skipped");
                return Ok(Outcome::Applied);
            }
            try_adapter!(
                self.deps
                    .committees
                    .update_committee(&token, &uid, &fetched.etag, &body_value)
                    .await,
                ctx
            );
            try_kv!(
                write_mapping_pair(
                    &self.deps,
                    RecordKind::Committee,
                    &id,
                    &uid,
                    Some(&project_v1),
                )
                .await
            );
            info!(kind = "committee", v1_id = %id, v2_uid = %uid, "committee updated");
        } else {
            let created = try_adapter!(
                self.deps.committees.create_committee(&token, &body_value).await,
                ctx
            );
            try_kv!(
                write_mapping_pair(
                    &self.deps,
                    RecordKind::Committee,
                    &id,
                    &created.uid,
                    Some(&project_v1),
                )
                .await
            );
            info!(kind = "committee", v1_id = %id, v2_uid = %created.uid, "committee created");
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

        let fwd_key = forward_key(RecordKind::Committee, id);
        let state = try_kv!(self.deps.mappings.read(&fwd_key).await);
        let uid = match &state {
            MappingState::Absent | MappingState::Tombstoned => return Ok(Outcome::Applied),
            MappingState::Live(_) => live_string(&state, &fwd_key)?,
        };

        let token = self.deps.bearer(ctx, AUD_COMMITTEE).await?;
        try_adapter!(
            self.deps.committees.delete_committee(&token, &uid, None).await,
            ctx
        );
        try_kv!(tombstone_pair(&self.deps, RecordKind::Committee, id, &uid).await);
        info!(kind = "committee", v1_id = %id, v2_uid = %uid, "committee deleted");
        Ok(Outcome::Applied)
    }
}
