//! The shared effectuation path for publish-backed record kinds.
//!
//! Phase 4 and 5 are identical for every kind that publishes instead of
//! calling REST: decide create vs update from the forward mapping, stamp
//! the v2 uid into the document, publish the indexer and access
//! envelopes, then write the mapping pair. Only the subjects, the access
//! shape, and the parent set differ per kind.

use std::collections::BTreeMap;

use serde_json::Value;
use uuid::Uuid;

use lfx_sync_mappers::IndexDoc;
use lfx_sync_mappings::{MappingState, forward_key};
use lfx_sync_types::{
    AccessData, AccessEnvelope, IndexAction, IndexerEnvelope, IndexingConfig, RecordKind,
};

use crate::context::SyncContext;
use crate::error::EngineError;
use crate::handlers::{
    HandlerDeps, envelope_value, live_string, tombstone_pair, try_adapter, try_kv,
    write_mapping_pair,
};
use crate::outcome::Outcome;

/// Everything the shared publish path needs from a handler.
pub(crate) struct PublishSpec {
    pub kind: RecordKind,
    /// Access-control object type (`meeting`, `past_meeting`, `vote`, ...).
    pub object_type: &'static str,
    pub v1_id: String,
    /// v1 parent path recorded in the reverse mapping.
    pub parent_path: Option<String>,
    pub doc: IndexDoc,
    pub index_subject: &'static str,
    pub access_subject: &'static str,
    /// `{type}:{uid}` entries, one per resolved parent, declared order.
    pub parent_refs: Vec<String>,
    pub references: Option<BTreeMap<String, Vec<String>>>,
    pub relations: Option<BTreeMap<String, Vec<String>>>,
    /// Derived documents published alongside the record (e.g. the
    /// transcript split out of a recording). Their object id is the
    /// record's uid plus the suffix; no mapping of their own.
    pub extra: Vec<ExtraDoc>,
}

/// A derived document riding on the main record's identity.
pub(crate) struct ExtraDoc {
    pub object_type: &'static str,
    pub id_suffix: &'static str,
    pub doc: IndexDoc,
    pub index_subject: &'static str,
    pub access_subject: &'static str,
}

/// Publishes an upsert: index envelope, access envelope, mapping writes.
pub(crate) async fn publish_upsert(
    deps: &HandlerDeps,
    ctx: &SyncContext,
    spec: PublishSpec,
) -> Result<Outcome, EngineError> {
    let fwd_key = forward_key(spec.kind, &spec.v1_id);
    let state = try_kv!(deps.mappings.read(&fwd_key).await);

    let (uid, action) = match &state {
        MappingState::Tombstoned => return Ok(Outcome::Skipped("previously deleted")),
        MappingState::Live(_) => (live_string(&state, &fwd_key)?, IndexAction::Updated),
        MappingState::Absent => (Uuid::new_v4().to_string(), IndexAction::Created),
    };

    let mut data = spec.doc.data;
    if let Value::Object(map) = &mut data {
        map.insert("uid".to_string(), Value::String(uid.clone()));
    }

    let headers = deps.indexer_headers(ctx).await?;
    let index = IndexerEnvelope {
        action,
        headers,
        data,
        indexing_config: IndexingConfig {
            object_id: uid.clone(),
            public: spec.doc.public,
            access_check_object: format!("{}:{uid}", spec.object_type),
            access_check_relation: "viewer".to_string(),
            history_check_object: format!("{}:{uid}", spec.object_type),
            history_check_relation: "writer".to_string(),
            sort_name: spec.doc.sort_name,
            name_and_aliases: spec.doc.name_and_aliases,
            parent_refs: spec.parent_refs,
            fulltext: spec.doc.fulltext,
        },
    };
    try_adapter!(
        deps.publisher
            .publish_json(spec.index_subject, &envelope_value(&index)?)
            .await,
        ctx
    );

    let access = AccessEnvelope::update(
        spec.object_type,
        AccessData {
            uid: uid.clone(),
            public: spec.doc.public,
            relations: spec.relations,
            references: spec.references,
            exclude_relations: None,
        },
    );
    try_adapter!(
        deps.publisher
            .publish_json(spec.access_subject, &envelope_value(&access)?)
            .await,
        ctx
    );

    for extra in spec.extra {
        let extra_id = format!("{uid}-{}", extra.id_suffix);
        let mut data = extra.doc.data;
        if let Value::Object(map) = &mut data {
            map.insert("uid".to_string(), Value::String(extra_id.clone()));
        }
        let envelope = IndexerEnvelope {
            action,
            headers: deps.indexer_headers(ctx).await?,
            data,
            indexing_config: IndexingConfig {
                object_id: extra_id.clone(),
                public: extra.doc.public,
                access_check_object: format!("{}:{extra_id}", extra.object_type),
                access_check_relation: "viewer".to_string(),
                history_check_object: format!("{}:{extra_id}", extra.object_type),
                history_check_relation: "writer".to_string(),
                sort_name: extra.doc.sort_name,
                name_and_aliases: extra.doc.name_and_aliases,
                parent_refs: vec![format!("{}:{uid}", spec.object_type)],
                fulltext: extra.doc.fulltext,
            },
        };
        try_adapter!(
            deps.publisher
                .publish_json(extra.index_subject, &envelope_value(&envelope)?)
                .await,
            ctx
        );
        let access = AccessEnvelope::update(
            extra.object_type,
            AccessData {
                uid: extra_id,
                public: extra.doc.public,
                relations: None,
                references: Some(BTreeMap::from([(
                    spec.object_type.to_string(),
                    vec![uid.clone()],
                )])),
                exclude_relations: None,
            },
        );
        try_adapter!(
            deps.publisher
                .publish_json(extra.access_subject, &envelope_value(&access)?)
                .await,
            ctx
        );
    }

    try_kv!(
        write_mapping_pair(
            deps,
            spec.kind,
            &spec.v1_id,
            &uid,
            spec.parent_path.as_deref(),
        )
        .await
    );
    Ok(Outcome::Applied)
}

/// Publishes a delete: deleted index envelope, delete-all access
/// envelope, then tombstones both mappings. Absent and already-tombstoned
/// records are a clean no-op.
pub(crate) async fn publish_delete(
    deps: &HandlerDeps,
    ctx: &SyncContext,
    kind: RecordKind,
    object_type: &'static str,
    v1_id: &str,
    index_subject: &'static str,
    delete_access_subject: &'static str,
) -> Result<Outcome, EngineError> {
    let fwd_key = forward_key(kind, v1_id);
    let state = try_kv!(deps.mappings.read(&fwd_key).await);
    let uid = match &state {
        MappingState::Absent | MappingState::Tombstoned => return Ok(Outcome::Applied),
        MappingState::Live(_) => live_string(&state, &fwd_key)?,
    };

    let headers = deps.indexer_headers(ctx).await?;
    let index = IndexerEnvelope::deleted(headers, uid.clone());
    try_adapter!(
        deps.publisher
            .publish_json(index_subject, &envelope_value(&index)?)
            .await,
        ctx
    );

    let access = AccessEnvelope::delete_all(object_type, uid.clone());
    try_adapter!(
        deps.publisher
            .publish_json(delete_access_subject, &envelope_value(&access)?)
            .await,
        ctx
    );

    try_kv!(tombstone_pair(deps, kind, v1_id, &uid).await);
    Ok(Outcome::Applied)
}
