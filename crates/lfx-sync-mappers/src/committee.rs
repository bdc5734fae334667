//! Committee mapper.

use serde::Serialize;
use serde_json::Value;

use lfx_sync_types::Payload;

use crate::{MapError, base_fields_equal, convert, enums};

/// Fields compared against the fetched base before sending an update.
/// Adding a field to [`CommitteePayload`] requires extending this list;
/// the equality check and the mapper move together.
pub const BASE_FIELDS: &[&str] = &["name", "category", "description", "website"];

/// The create/update body for the v2 committee service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitteePayload {
    pub name: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub project_uid: String,
}

impl CommitteePayload {
    pub fn differs_from(&self, current: &Value) -> bool {
        let ours = serde_json::to_value(self).expect("committee payload serializes");
        !base_fields_equal(&ours, current, BASE_FIELDS)
    }
}

/// Maps a v1 committee record under its resolved parent project.
pub fn committee_payload(payload: &Payload, project_uid: &str) -> Result<CommitteePayload, MapError> {
    let name = payload
        .string_field("name")
        .ok_or(MapError::MissingField("name"))?;

    Ok(CommitteePayload {
        category: enums::committee_category(payload.str_field("type__c"), &name).to_string(),
        description: payload.string_field("description"),
        website: payload.str_field("website").and_then(convert::clean_url),
        project_uid: project_uid.to_string(),
        name,
    })
}

/// The v1 id of the parent project. A committee without one cannot be
/// placed and is skipped by the handler.
pub fn parent_project_id(payload: &Payload) -> Option<String> {
    payload.string_field("project_id")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> Payload {
        Payload::from_object(value.as_object().unwrap().clone())
    }

    #[test]
    fn maps_committee_with_category_whitelist() {
        let p = payload(json!({
            "name": "Budget Group",
            "type__c": "Budget Committee",
            "project_id": "P001",
        }));
        let mapped = committee_payload(&p, "UP1").unwrap();
        assert_eq!(mapped.category, "Budget Committee");
        assert_eq!(mapped.project_uid, "UP1");
    }

    #[test]
    fn unknown_category_maps_to_other() {
        let p = payload(json!({"name": "X", "type__c": "Steering Circle"}));
        assert_eq!(committee_payload(&p, "U").unwrap().category, "Other");
    }

    #[test]
    fn combined_toc_tac_uses_name() {
        let p = payload(json!({
            "name": "OpenFoo TAC",
            "type__c": "Technical Oversight Committee/Technical Advisory Committee",
        }));
        assert_eq!(
            committee_payload(&p, "U").unwrap().category,
            "Technical Advisory Committee"
        );
    }

    #[test]
    fn missing_name_is_fatal() {
        let p = payload(json!({"type__c": "Board"}));
        assert!(committee_payload(&p, "U").is_err());
    }

    #[test]
    fn diff_ignores_project_uid() {
        // project_uid is structural, not part of the editable base
        let p = payload(json!({"name": "Budget Group"}));
        let mapped = committee_payload(&p, "UP1").unwrap();
        let current = json!({"name": "Budget Group", "category": "Other", "project_uid": "other"});
        assert!(!mapped.differs_from(&current));
    }
}
