//! Meeting registrant and invite-response (RSVP) mappers.

use serde_json::json;

use lfx_sync_types::Payload;

use crate::{IndexDoc, MapError, convert, fulltext_of};

/// Maps a meeting registrant under its resolved parent meeting.
pub fn registrant_doc(payload: &Payload, meeting_uid: &str) -> Result<IndexDoc, MapError> {
    let email = payload
        .string_field("email")
        .ok_or(MapError::MissingField("email"))?;

    let display_name = display_name(payload, &email);

    let data = json!({
        "email": email,
        "first_name": payload.str_field("first_name"),
        "last_name": payload.str_field("last_name"),
        "org_name": payload.str_field("org_name"),
        "occurrence_id": payload.str_field("occurrence_id"),
        "host": payload.bool_field("host").unwrap_or(false),
        "meeting_uid": meeting_uid,
    });

    Ok(IndexDoc {
        sort_name: display_name.clone(),
        name_and_aliases: vec![display_name.clone(), email.clone()],
        fulltext: fulltext_of(&[Some(&display_name), Some(&email), payload.str_field("org_name")]),
        public: false,
        data,
    })
}

/// The access-control subject for a registrant, when the record carries a
/// platform username. Registrants without one get no relation entry.
pub fn registrant_subject(payload: &Payload) -> Option<String> {
    payload.str_field("username").map(convert::auth_subject)
}

/// Invite responses. Unknown responses collapse to "none".
pub fn rsvp_doc(payload: &Payload, meeting_uid: &str) -> Result<IndexDoc, MapError> {
    let email = payload
        .string_field("email")
        .ok_or(MapError::MissingField("email"))?;

    let response = match payload
        .str_field("response")
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("yes") => "yes",
        Some("no") => "no",
        Some("maybe") => "maybe",
        _ => "none",
    };

    let display_name = display_name(payload, &email);

    let data = json!({
        "email": email,
        "response": response,
        "occurrence_id": payload.str_field("occurrence_id"),
        "meeting_uid": meeting_uid,
    });

    Ok(IndexDoc {
        sort_name: display_name.clone(),
        name_and_aliases: vec![display_name, email],
        fulltext: response.to_string(),
        public: false,
        data,
    })
}

fn display_name(payload: &Payload, fallback: &str) -> String {
    match (payload.str_field("first_name"), payload.str_field("last_name")) {
        (Some(first), Some(last)) => format!("{first} {last}"),
        (Some(first), None) => first.to_string(),
        (None, Some(last)) => last.to_string(),
        (None, None) => fallback.to_string(),
    }
}

/// The v1 id of the parent meeting.
pub fn parent_meeting_id(payload: &Payload) -> Option<String> {
    payload.string_field("meeting_id")
}
