//! Outbound message schemas: the indexer envelope (search indexing) and the
//! access envelope (authorization policy updates).

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// Lifecycle action carried by an indexer envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexAction {
    Created,
    Updated,
    Deleted,
}

/// Headers forwarded to the downstream indexer.
#[derive(Debug, Clone, Serialize)]
pub struct EnvelopeHeaders {
    /// Bearer token attributed to the originating identity.
    pub authorization: String,
    /// Principal the operation is performed on behalf of, when distinct
    /// from the token subject.
    #[serde(rename = "x-on-behalf-of", skip_serializing_if = "Option::is_none")]
    pub on_behalf_of: Option<String>,
}

/// Indexing directives interpreted by the downstream indexer. Templated
/// strings like `{{ uid }}` are resolved downstream, not here.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexingConfig {
    pub object_id: String,
    pub public: bool,
    pub access_check_object: String,
    pub access_check_relation: String,
    pub history_check_object: String,
    pub history_check_relation: String,
    pub sort_name: String,
    pub name_and_aliases: Vec<String>,
    /// `{type}:{v2id}` entries, one per non-empty resolved parent, in
    /// declared-parent order.
    pub parent_refs: Vec<String>,
    pub fulltext: String,
}

/// The message published on `lfx.index.*` subjects.
#[derive(Debug, Clone, Serialize)]
pub struct IndexerEnvelope {
    pub action: IndexAction,
    pub headers: EnvelopeHeaders,
    pub data: Value,
    pub indexing_config: IndexingConfig,
}

impl IndexerEnvelope {
    /// A delete envelope carries only the object id; downstream removes the
    /// document without consulting `data`.
    pub fn deleted(headers: EnvelopeHeaders, object_id: impl Into<String>) -> Self {
        Self {
            action: IndexAction::Deleted,
            headers,
            data: Value::Null,
            indexing_config: IndexingConfig {
                object_id: object_id.into(),
                ..IndexingConfig::default()
            },
        }
    }
}

/// Access-control payload published on `lfx.update_access.*` and
/// `lfx.fga-sync.update_access` subjects.
#[derive(Debug, Clone, Serialize)]
pub struct AccessData {
    pub uid: String,
    pub public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relations: Option<BTreeMap<String, Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<BTreeMap<String, Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_relations: Option<Vec<String>>,
}

/// The message published on access subjects.
#[derive(Debug, Clone, Serialize)]
pub struct AccessEnvelope {
    pub object_type: String,
    pub operation: String,
    pub data: AccessData,
}

impl AccessEnvelope {
    pub fn update(object_type: impl Into<String>, data: AccessData) -> Self {
        Self {
            object_type: object_type.into(),
            operation: "update_access".to_string(),
            data,
        }
    }

    pub fn delete_all(object_type: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            operation: "delete_all_access".to_string(),
            data: AccessData {
                uid: uid.into(),
                public: false,
                relations: None,
                references: None,
                exclude_relations: None,
            },
        }
    }
}

/// Formats a `parent_refs` entry.
pub fn parent_ref(parent_type: &str, v2id: &str) -> String {
    format!("{parent_type}:{v2id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn indexer_envelope_serializes_action_lowercase() {
        let envelope = IndexerEnvelope {
            action: IndexAction::Created,
            headers: EnvelopeHeaders {
                authorization: "Bearer t".to_string(),
                on_behalf_of: None,
            },
            data: json!({"uid": "U1"}),
            indexing_config: IndexingConfig::default(),
        };

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["action"], "created");
        // x-on-behalf-of must be omitted entirely when unset
        assert!(value["headers"].as_object().unwrap().get("x-on-behalf-of").is_none());
    }

    #[test]
    fn on_behalf_of_header_name() {
        let headers = EnvelopeHeaders {
            authorization: "Bearer t".to_string(),
            on_behalf_of: Some("jdoe".to_string()),
        };
        let value = serde_json::to_value(&headers).unwrap();
        assert_eq!(value["x-on-behalf-of"], "jdoe");
    }

    #[test]
    fn access_envelope_delete_all() {
        let envelope = AccessEnvelope::delete_all("meeting", "M1");
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["operation"], "delete_all_access");
        assert_eq!(value["data"]["uid"], "M1");
        assert!(value["data"].as_object().unwrap().get("relations").is_none());
    }

    #[test]
    fn parent_ref_format() {
        assert_eq!(parent_ref("project", "U1"), "project:U1");
    }
}
