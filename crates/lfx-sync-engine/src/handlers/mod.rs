//! Handler framework: shared dependencies, the five-phase helpers, and
//! the per-kind handler modules.

pub mod committees;
pub mod meetings;
pub mod members;
pub mod past_meetings;
pub mod projects;
pub mod registrants;
pub mod surveys;
pub mod votes;

mod publish_common;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use lfx_sync_adapters::{AdapterError, CommitteeApi, OrgDirectory, ProjectApi, Publisher};
use lfx_sync_auth::TokenMinter;
use lfx_sync_broker::{BrokerError, KvBucket};
use lfx_sync_mappings::{MappingState, MappingStore, forward_key, reverse_key, reverse_value};
use lfx_sync_types::{ChangeEvent, EnvelopeHeaders, Payload, RecordKind};

use crate::context::{AUD_INDEXER, SyncContext};
use crate::error::EngineError;
use crate::outcome::Outcome;

pub(crate) use publish_common::{ExtraDoc, PublishSpec, publish_delete, publish_upsert};

/// One record kind's sync logic. Registered by bucket key prefix; the
/// dispatcher routes decoded events here.
#[async_trait]
pub trait RecordHandler: Send + Sync {
    fn kind(&self) -> RecordKind;

    async fn on_put(
        &self,
        ctx: &SyncContext,
        event: &ChangeEvent,
        payload: &Payload,
    ) -> Result<Outcome, EngineError>;

    async fn on_delete(&self, ctx: &SyncContext, event: &ChangeEvent)
    -> Result<Outcome, EngineError>;
}

/// Read access to the `v1-objects` bucket, used by the meeting-committee
/// join handler to hydrate the joined meeting.
#[async_trait]
pub trait ObjectReader: Send + Sync {
    async fn get_object(&self, key: &str) -> Result<Option<Bytes>, BrokerError>;
}

#[async_trait]
impl ObjectReader for KvBucket {
    async fn get_object(&self, key: &str) -> Result<Option<Bytes>, BrokerError> {
        self.get(key).await
    }
}

/// In-memory object reader for tests.
#[derive(Default)]
pub struct MemoryObjectReader {
    entries: Mutex<HashMap<String, Bytes>>,
}

impl MemoryObjectReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<Bytes>) {
        self.entries
            .lock()
            .expect("object reader lock")
            .insert(key.into(), value.into());
    }
}

#[async_trait]
impl ObjectReader for MemoryObjectReader {
    async fn get_object(&self, key: &str) -> Result<Option<Bytes>, BrokerError> {
        Ok(self
            .entries
            .lock()
            .expect("object reader lock")
            .get(key)
            .cloned())
    }
}

/// Everything a handler needs, shared across all of them. Handlers keep
/// no mutable state of their own; per-event state lives on the stack.
pub struct HandlerDeps {
    pub mappings: MappingStore,
    pub objects: Arc<dyn ObjectReader>,
    pub projects: Arc<dyn ProjectApi>,
    pub committees: Arc<dyn CommitteeApi>,
    pub publisher: Arc<dyn Publisher>,
    pub orgs: Arc<dyn OrgDirectory>,
    pub tokens: Arc<TokenMinter>,
    /// Audience per downstream service, from configuration.
    pub audiences: BTreeMap<String, String>,
}

impl HandlerDeps {
    /// A bearer token for the event's identity against the audience
    /// registered under `audience_key`. An unregistered key falls back to
    /// the key itself so partial audience tables stay usable.
    pub async fn bearer(
        &self,
        ctx: &SyncContext,
        audience_key: &str,
    ) -> Result<String, EngineError> {
        let audience = self
            .audiences
            .get(audience_key)
            .map_or(audience_key, String::as_str);
        Ok(self.tokens.bearer(&ctx.identity, audience).await?)
    }

    /// Headers for indexer envelopes. `x-on-behalf-of` is set only for
    /// looked-up user identities; machine identities act as themselves.
    pub async fn indexer_headers(&self, ctx: &SyncContext) -> Result<EnvelopeHeaders, EngineError> {
        let authorization = self.bearer(ctx, AUD_INDEXER).await?;
        Ok(EnvelopeHeaders {
            authorization,
            on_behalf_of: ctx
                .identity
                .email
                .is_some()
                .then(|| ctx.identity.principal.clone()),
        })
    }
}

/// Phase 1: the skip sentinels. Soft-deleted records and records that
/// originated in v2 (and would otherwise echo back) are never synced.
pub(crate) fn should_skip(payload: &Payload) -> bool {
    payload.is_truthy("is_deleted")
        || payload
            .str_field("origin")
            .is_some_and(|origin| origin.eq_ignore_ascii_case("v2"))
}

/// Phase 2: the record's v1 id — the payload's `id` field, falling back
/// to the last key segment. An empty id is a fatal event error.
pub(crate) fn record_id(event: &ChangeEvent, payload: &Payload) -> Result<String, EngineError> {
    if let Some(id) = payload.string_field("id") {
        return Ok(id);
    }
    let id = event.key_id();
    if id.is_empty() {
        Err(EngineError::MissingId)
    } else {
        Ok(id.to_string())
    }
}

/// Decodes a live mapping value as UTF-8.
pub(crate) fn live_string(state: &MappingState, key: &str) -> Result<String, EngineError> {
    state
        .live_str()
        .map(str::to_string)
        .ok_or_else(|| EngineError::BadMapping {
            key: key.to_string(),
        })
}

/// Classifies an adapter failure per the error taxonomy: transient →
/// retry, entity-tag conflict → one retry then fatal, everything else
/// fatal.
pub(crate) fn classify_adapter(
    error: AdapterError,
    delivery_attempt: u64,
) -> Result<Outcome, EngineError> {
    match error {
        AdapterError::Transient(reason) => Ok(Outcome::Retry(reason)),
        AdapterError::PreconditionFailed if delivery_attempt <= 1 => {
            Ok(Outcome::Retry("entity tag conflict".to_string()))
        }
        AdapterError::PreconditionFailed => Err(EngineError::EtagConflict),
        other => Err(EngineError::Downstream(other)),
    }
}

/// Unwraps a KV result, turning broker failures into a retry outcome.
macro_rules! try_kv {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(err) => return Ok($crate::outcome::Outcome::Retry(err.to_string())),
        }
    };
}

/// Unwraps an adapter result, classifying failures against the delivery
/// attempt.
macro_rules! try_adapter {
    ($expr:expr, $ctx:expr) => {
        match $expr {
            Ok(value) => value,
            Err(err) => return $crate::handlers::classify_adapter(err, $ctx.delivery_attempt),
        }
    };
}

pub(crate) use try_adapter;
pub(crate) use try_kv;

/// Writes the forward/reverse mapping pair for a live record.
pub(crate) async fn write_mapping_pair(
    deps: &HandlerDeps,
    kind: RecordKind,
    v1_id: &str,
    v2_uid: &str,
    parent: Option<&str>,
) -> Result<(), BrokerError> {
    deps.mappings.put(&forward_key(kind, v1_id), v2_uid).await?;
    deps.mappings
        .put(&reverse_key(kind, v2_uid), &reverse_value(parent, v1_id))
        .await
}

/// Tombstones both directions after a successful delete.
pub(crate) async fn tombstone_pair(
    deps: &HandlerDeps,
    kind: RecordKind,
    v1_id: &str,
    v2_uid: &str,
) -> Result<(), BrokerError> {
    deps.mappings.tombstone(&forward_key(kind, v1_id)).await?;
    deps.mappings.tombstone(&reverse_key(kind, v2_uid)).await
}

/// Serializes an envelope for publishing.
pub(crate) fn envelope_value<T: serde::Serialize>(envelope: &T) -> Result<serde_json::Value, EngineError> {
    serde_json::to_value(envelope)
        .map_err(|e| EngineError::Downstream(AdapterError::Decode(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> Payload {
        Payload::from_object(value.as_object().unwrap().clone())
    }

    fn event(key: &str) -> ChangeEvent {
        ChangeEvent {
            key: key.to_string(),
            operation: lfx_sync_types::KvOperation::Put,
            sequence: 1,
            delivery_attempt: 1,
            payload: None,
        }
    }

    #[test]
    fn skip_sentinels() {
        assert!(should_skip(&payload(json!({"is_deleted": true}))));
        assert!(should_skip(&payload(json!({"is_deleted": "1"}))));
        assert!(should_skip(&payload(json!({"origin": "v2"}))));
        assert!(!should_skip(&payload(json!({"origin": "v1"}))));
        assert!(!should_skip(&payload(json!({"name": "x"}))));
    }

    #[test]
    fn record_id_prefers_payload() {
        let e = event("projects.sfid.P001");
        assert_eq!(record_id(&e, &payload(json!({"id": "X9"}))).unwrap(), "X9");
        assert_eq!(record_id(&e, &payload(json!({}))).unwrap(), "P001");
    }

    #[test]
    fn precondition_retries_once_then_escalates() {
        assert_eq!(
            classify_adapter(AdapterError::PreconditionFailed, 1).unwrap(),
            Outcome::Retry("entity tag conflict".to_string())
        );
        assert!(matches!(
            classify_adapter(AdapterError::PreconditionFailed, 2),
            Err(EngineError::EtagConflict)
        ));
    }

    #[test]
    fn logical_errors_are_fatal() {
        let result = classify_adapter(
            AdapterError::Logical {
                status: 404,
                body: String::new(),
            },
            1,
        );
        assert!(matches!(result, Err(EngineError::Downstream(_))));
    }
}
