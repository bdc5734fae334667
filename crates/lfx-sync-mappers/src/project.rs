//! Project mapper: v1 project records → v2 project service payloads.

use serde::Serialize;
use serde_json::Value;

use lfx_sync_types::Payload;

use crate::{MapError, base_fields_equal, convert, enums};

/// Fields compared against the fetched base before sending an update.
pub const BASE_FIELDS: &[&str] = &[
    "slug",
    "name",
    "description",
    "project_type",
    "parent_uid",
    "website",
    "logo_url",
    "start_date",
    "end_date",
];

/// The create/update body for the v2 project service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectPayload {
    pub slug: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub project_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl ProjectPayload {
    /// Whether the payload differs from the fetched current base.
    pub fn differs_from(&self, current: &Value) -> bool {
        let ours = serde_json::to_value(self).expect("project payload serializes");
        !base_fields_equal(&ours, current, BASE_FIELDS)
    }
}

/// Maps a v1 project record. `parent_uid` is the resolved v2 id of the
/// parent project, when the record declares one.
pub fn project_payload(
    payload: &Payload,
    parent_uid: Option<&str>,
) -> Result<ProjectPayload, MapError> {
    let name = payload
        .string_field("name")
        .ok_or(MapError::MissingField("name"))?;
    let slug = payload
        .string_field("slug")
        .ok_or(MapError::MissingField("slug"))?;

    Ok(ProjectPayload {
        slug,
        name,
        description: payload.string_field("description"),
        project_type: enums::project_type(payload.str_field("project_type")).to_string(),
        parent_uid: parent_uid.map(str::to_string),
        website: payload.str_field("website").and_then(convert::clean_url),
        logo_url: payload.str_field("logo_url").and_then(convert::clean_url),
        start_date: payload
            .str_field("start_date__c")
            .and_then(convert::normalize_date),
        end_date: payload
            .str_field("end_date__c")
            .and_then(convert::normalize_date),
    })
}

/// The v1 id of the parent project, when declared.
pub fn parent_project_id(payload: &Payload) -> Option<String> {
    payload.string_field("parent_project")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> Payload {
        Payload::from_object(value.as_object().unwrap().clone())
    }

    #[test]
    fn maps_minimal_project() {
        let p = payload(json!({
            "slug": "openfoo",
            "name": "OpenFoo",
            "project_type": "Project Group",
        }));
        let mapped = project_payload(&p, None).unwrap();
        assert_eq!(mapped.slug, "openfoo");
        assert_eq!(mapped.name, "OpenFoo");
        assert_eq!(mapped.project_type, "Project Group");
        assert_eq!(mapped.parent_uid, None);
    }

    #[test]
    fn missing_name_is_fatal() {
        let p = payload(json!({"slug": "openfoo"}));
        assert!(matches!(
            project_payload(&p, None),
            Err(MapError::MissingField("name"))
        ));
    }

    #[test]
    fn cleans_urls_and_dates() {
        let p = payload(json!({
            "slug": "openfoo",
            "name": "OpenFoo",
            "website": "openfoo.org",
            "logo_url": "not a url",
            "start_date__c": "2020-01-15",
        }));
        let mapped = project_payload(&p, Some("UP")).unwrap();
        assert_eq!(mapped.website.as_deref(), Some("https://openfoo.org/"));
        assert_eq!(mapped.logo_url, None);
        assert_eq!(mapped.start_date.as_deref(), Some("2020-01-15T00:00:00+00:00"));
        assert_eq!(mapped.parent_uid.as_deref(), Some("UP"));
    }

    #[test]
    fn diff_is_stable_under_equal_base() {
        let p = payload(json!({"slug": "openfoo", "name": "OpenFoo"}));
        let mapped = project_payload(&p, None).unwrap();
        let current = serde_json::to_value(&mapped).unwrap();
        assert!(!mapped.differs_from(&current));

        let drifted = json!({"slug": "openfoo", "name": "OpenBar"});
        assert!(mapped.differs_from(&drifted));
    }
}
