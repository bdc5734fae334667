//! Committee member handler.
//!
//! The forward mapping value is compound: `{committeeV2id}:{memberV2id}`.
//! Values written before the format change carry only the member id and
//! are upgraded in place on the next successful upsert.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info};

use lfx_sync_mappers::member;
use lfx_sync_mappings::{MappingState, forward_key, join_compound, reverse_key, reverse_value, split_compound};
use lfx_sync_types::{ChangeEvent, Payload, RecordKind};

use crate::context::{AUD_COMMITTEE, SyncContext};
use crate::error::EngineError;
use crate::handlers::{
    HandlerDeps, RecordHandler, envelope_value, live_string, record_id, should_skip, try_adapter,
    try_kv,
};
use crate::outcome::Outcome;

pub struct CommitteeMemberHandler {
    deps: Arc<HandlerDeps>,
}

impl CommitteeMemberHandler {
    pub fn new(deps: Arc<HandlerDeps>) -> Self {
        Self { deps }
    }

    /// Writes the compound forward mapping plus the reverse mapping.
    async fn write_member_mappings(
        &self,
        v1_id: &str,
        committee_v1: &str,
        committee_uid: &str,
        member_uid: &str,
    ) -> Result<(), lfx_sync_broker::BrokerError> {
        self.deps
            .mappings
            .put(
                &forward_key(RecordKind::CommitteeMember, v1_id),
                &join_compound(committee_uid, member_uid),
            )
            .await?;
        self.deps
            .mappings
            .put(
                &reverse_key(RecordKind::CommitteeMember, member_uid),
                &reverse_value(Some(committee_v1), v1_id),
            )
            .await
    }
}

#[async_trait]
impl RecordHandler for CommitteeMemberHandler {
    fn kind(&self) -> RecordKind {
        RecordKind::CommitteeMember
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

        let Some(committee_v1) = member::parent_committee_id(payload) else {
            return Ok(Outcome::Skipped("member without committee"));
        };
        let committee_key = forward_key(RecordKind::Committee, &committee_v1);
        let committee_uid = match try_kv!(self.deps.mappings.read(&committee_key).await) {
            MappingState::Absent => return Ok(Outcome::Skipped("committee not mapped")),
            MappingState::Tombstoned => return Ok(Outcome::Skipped("committee deleted")),
            state @ MappingState::Live(_) => live_string(&state, &committee_key)?,
        };

        let fwd_key = forward_key(RecordKind::CommitteeMember, &id);
        let state = try_kv!(self.deps.mappings.read(&fwd_key).await);
        if state.is_tombstoned() {
            return Ok(Outcome::Skipped("previously deleted"));
        }

        // Soft-failing org enrichment.
        let organization = match member::organization_id(payload) {
            Some(org_id) => self.deps.orgs.org_name(&org_id).await,
            None => None,
        };

        let body = member::member_payload(payload, organization)?;
        let body_value = envelope_value(&body)?;
        let token = self.deps.bearer(ctx, AUD_COMMITTEE).await?;

        if state.is_live() {
            let stored = live_string(&state, &fwd_key)?;
            // Legacy values carry no committee segment; address the member
            // through the currently-resolved committee and upgrade below.
            let (stored_committee, member_uid) = split_compound(&stored);
            let endpoint_committee = stored_committee.unwrap_or(&committee_uid);

            let fetched = try_adapter!(
                self.deps
                    .committees
                    .get_member(&token, endpoint_committee, member_uid)
                    .await,
                ctx
            );
            if body.differs_from(&fetched.body) {
                try_adapter!(
                    self.deps
                        .committees
                        .update_member(&token, endpoint_committee, member_uid, &fetched.etag, &body_value)
                        .await,
                    ctx
                );
            } else {
                debug!(kind = "committee_member", v1_id = %id, "no base change, update skipped");
            }
            try_kv!(
                self.write_member_mappings(&id, &committee_v1, endpoint_committee, member_uid)
                    .await
            );
            info!(kind = "committee_member", v1_id = %id, v2_uid = %member_uid, "member updated");
        } else {
            let created = try_adapter!(
                self.deps
                    .committees
                    .create_member(&token, &committee_uid, &body_value)
                    .await,
                ctx
            );
            try_kv!(
                self.write_member_mappings(&id, &committee_v1, &committee_uid, &created.uid)
                    .await
            );
            info!(kind = "committee_member", v1_id = %id, v2_uid = %created.uid, "member created");
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

        let fwd_key = forward_key(RecordKind::CommitteeMember, id);
        let state = try_kv!(self.deps.mappings.read(&fwd_key).await);
        let stored = match &state {
            MappingState::Absent | MappingState::Tombstoned => return Ok(Outcome::Applied),
            MappingState::Live(_) => live_string(&state, &fwd_key)?,
        };

        let (committee_uid, member_uid) = match split_compound(&stored) {
            (Some(committee_uid), member_uid) => (committee_uid, member_uid),
            (None, _) => {
                // Legacy value with no committee segment: the delete cannot
                // be addressed. Fatal per record; the mapping stays live for
                // a later upsert to upgrade.
                error!(kind = "committee_member", v1_id = %id, key = %fwd_key, "legacy mapping value blocks delete");
                return Err(EngineError::BadMapping { key: fwd_key });
            }
        };

        let token = self.deps.bearer(ctx, AUD_COMMITTEE).await?;
        try_adapter!(
            self.deps
                .committees
                .delete_member(&token, committee_uid, member_uid, None)
                .await,
            ctx
        );
        try_kv!(self.deps.mappings.tombstone(&fwd_key).await);
        try_kv!(
            self.deps
                .mappings
                .tombstone(&reverse_key(RecordKind::CommitteeMember, member_uid))
                .await
        );
        info!(kind = "committee_member", v1_id = %id, v2_uid = %member_uid, "member deleted");
        Ok(Outcome::Applied)
    }
}
