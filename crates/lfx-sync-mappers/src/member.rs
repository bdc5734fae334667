//! Committee member mapper.

use serde::Serialize;
use serde_json::Value;

use lfx_sync_types::Payload;

use crate::{MapError, base_fields_equal, enums};

/// Fields compared against the fetched base before sending an update.
pub const BASE_FIELDS: &[&str] = &[
    "email",
    "first_name",
    "last_name",
    "username",
    "role",
    "organization",
    "voting_status",
];

/// The create/update body for committee member endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberPayload {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub role: String,
    /// Organization display name, resolved through the org lookup.
    /// Lookup failures leave this empty rather than failing the record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voting_status: Option<String>,
}

impl MemberPayload {
    pub fn differs_from(&self, current: &Value) -> bool {
        let ours = serde_json::to_value(self).expect("member payload serializes");
        !base_fields_equal(&ours, current, BASE_FIELDS)
    }
}

/// Maps a v1 committee membership record. `organization` carries the
/// soft-failing org cross-lookup result.
pub fn member_payload(
    payload: &Payload,
    organization: Option<String>,
) -> Result<MemberPayload, MapError> {
    let email = payload
        .string_field("email")
        .ok_or(MapError::MissingField("email"))?;

    Ok(MemberPayload {
        email,
        first_name: payload.string_field("first_name"),
        last_name: payload.string_field("last_name"),
        username: payload.string_field("username"),
        role: enums::member_role(payload.str_field("role__c")).to_string(),
        organization,
        voting_status: payload.string_field("voting_status"),
    })
}

/// The v1 id of the parent committee.
pub fn parent_committee_id(payload: &Payload) -> Option<String> {
    payload.string_field("committee_id")
}

/// The v1 organization id for the cross-lookup, when present.
pub fn organization_id(payload: &Payload) -> Option<String> {
    payload.string_field("organization_id")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> Payload {
        Payload::from_object(value.as_object().unwrap().clone())
    }

    #[test]
    fn maps_member_with_role_whitelist() {
        let p = payload(json!({
            "email": "jdoe@example.org",
            "first_name": "J",
            "last_name": "Doe",
            "role__c": "Chair",
            "committee_id": "C1",
        }));
        let mapped = member_payload(&p, Some("Example Org".to_string())).unwrap();
        assert_eq!(mapped.role, "Chair");
        assert_eq!(mapped.organization.as_deref(), Some("Example Org"));
    }

    #[test]
    fn unknown_role_maps_to_none() {
        let p = payload(json!({"email": "a@b.c", "role__c": "Grand Vizier"}));
        assert_eq!(member_payload(&p, None).unwrap().role, "None");
    }

    #[test]
    fn missing_email_is_fatal() {
        let p = payload(json!({"first_name": "J"}));
        assert!(matches!(
            member_payload(&p, None),
            Err(MapError::MissingField("email"))
        ));
    }

    #[test]
    fn diff_detects_role_change() {
        let p = payload(json!({"email": "a@b.c", "role__c": "Member"}));
        let mapped = member_payload(&p, None).unwrap();
        let current = json!({"email": "a@b.c", "role": "Chair"});
        assert!(mapped.differs_from(&current));
    }
}
