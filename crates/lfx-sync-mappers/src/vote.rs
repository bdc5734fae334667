//! Vote and vote-response mappers.

use serde_json::json;

use lfx_sync_types::Payload;

use crate::{IndexDoc, MapError, convert, fulltext_of};

pub fn vote_doc(
    payload: &Payload,
    project_uid: &str,
    committee_uid: Option<&str>,
) -> Result<IndexDoc, MapError> {
    let name = payload
        .string_field("name")
        .ok_or(MapError::MissingField("name"))?;

    let data = json!({
        "name": name,
        "description": payload.str_field("description"),
        "status": payload.str_field("status"),
        "end_time": payload.str_field("end_time").and_then(convert::normalize_date),
        "project_uid": project_uid,
        "committee_uid": committee_uid,
    });

    Ok(IndexDoc {
        sort_name: name.clone(),
        name_and_aliases: vec![name.clone()],
        fulltext: fulltext_of(&[Some(&name), payload.str_field("description")]),
        public: false,
        data,
    })
}

pub fn vote_response_doc(
    payload: &Payload,
    project_uid: &str,
    committee_uid: Option<&str>,
) -> Result<IndexDoc, MapError> {
    let vote_id = payload
        .string_field("vote_id")
        .ok_or(MapError::MissingField("vote_id"))?;
    let voter = payload
        .string_field("voter_email")
        .ok_or(MapError::MissingField("voter_email"))?;

    let data = json!({
        "vote_id": vote_id,
        "voter_email": voter,
        "voter_username": payload.str_field("voter_username"),
        "response": payload.str_field("response"),
        "project_uid": project_uid,
        "committee_uid": committee_uid,
    });

    Ok(IndexDoc {
        sort_name: voter.clone(),
        name_and_aliases: vec![voter],
        fulltext: payload.str_field("response").unwrap_or_default().to_string(),
        public: false,
        data,
    })
}

/// Parent ids: votes hang off a project, optionally scoped to a committee.
pub fn parent_project_id(payload: &Payload) -> Option<String> {
    payload.string_field("project_id")
}

pub fn parent_committee_id(payload: &Payload) -> Option<String> {
    payload.string_field("committee_id")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(value: serde_json::Value) -> Payload {
        Payload::from_object(value.as_object().unwrap().clone())
    }

    #[test]
    fn maps_vote_with_optional_committee() {
        let p = payload(json!({
            "name": "Adopt charter",
            "status": "open",
            "end_time": "2024-06-01",
            "project_id": "P1",
        }));
        let doc = vote_doc(&p, "UP1", Some("UC1")).unwrap();
        assert_eq!(doc.data["project_uid"], "UP1");
        assert_eq!(doc.data["committee_uid"], "UC1");
        assert_eq!(doc.data["end_time"], "2024-06-01T00:00:00+00:00");

        let doc = vote_doc(&p, "UP1", None).unwrap();
        assert!(doc.data["committee_uid"].is_null());
    }

    #[test]
    fn vote_requires_name() {
        let p = payload(json!({"status": "open"}));
        assert!(vote_doc(&p, "UP1", None).is_err());
    }

    #[test]
    fn response_requires_vote_and_voter() {
        let p = payload(json!({"vote_id": "V1", "voter_email": "a@b.c", "response": "approve"}));
        let doc = vote_response_doc(&p, "UP1", None).unwrap();
        assert_eq!(doc.data["vote_id"], "V1");
        assert_eq!(doc.fulltext, "approve");

        let missing = payload(json!({"voter_email": "a@b.c"}));
        assert!(vote_response_doc(&missing, "UP1", None).is_err());
    }
}
