//! Meeting mapper: index documents for upcoming meetings.

use serde_json::json;

use lfx_sync_types::Payload;

use crate::{IndexDoc, MapError, convert, enums, fulltext_of, recurrence};

/// Maps a v1 meeting into its index document. `project_uid` is the
/// resolved parent project (optional for meetings), `committees` the
/// cumulative committee set from the join mappings.
pub fn meeting_doc(
    payload: &Payload,
    project_uid: Option<&str>,
    committees: &[String],
) -> Result<IndexDoc, MapError> {
    let topic = payload
        .string_field("topic")
        .ok_or(MapError::MissingField("topic"))?;

    let duration = payload.i64_field("duration").unwrap_or(60);
    let occurrences = recurrence::occurrences(payload, duration);
    let public = enums::is_public_visibility(payload.str_field("visibility"));

    let data = json!({
        "topic": topic,
        "description": payload.str_field("description"),
        "agenda": payload.str_field("agenda"),
        "start_time": payload.str_field("start_time"),
        "duration": duration,
        "timezone": payload.str_field("timezone"),
        "visibility": if public { "public" } else { "private" },
        "join_url": payload.str_field("join_url").and_then(convert::clean_url),
        "platform_meeting_id": payload.string_field("meeting_id"),
        "project_uid": project_uid,
        "committees": committees,
        "occurrences": occurrences,
    });

    Ok(IndexDoc {
        sort_name: topic.clone(),
        name_and_aliases: vec![topic.clone()],
        fulltext: fulltext_of(&[
            Some(&topic),
            payload.str_field("description"),
            payload.str_field("agenda"),
        ]),
        public,
        data,
    })
}

/// The v1 id of the parent project, when the meeting is project-scoped.
pub fn parent_project_id(payload: &Payload) -> Option<String> {
    payload.string_field("project_id")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn payload(value: Value) -> Payload {
        Payload::from_object(value.as_object().unwrap().clone())
    }

    #[test]
    fn maps_meeting_with_committees() {
        let p = payload(json!({
            "topic": "TSC Weekly",
            "description": "Weekly sync",
            "start_time": "2024-01-01T10:00:00Z",
            "duration": "45",
            "visibility": "public",
            "project_id": "P001",
        }));
        let doc = meeting_doc(&p, Some("UP1"), &["UC1".to_string(), "UC2".to_string()]).unwrap();

        assert!(doc.public);
        assert_eq!(doc.sort_name, "TSC Weekly");
        assert_eq!(doc.data["duration"], 45);
        assert_eq!(doc.data["project_uid"], "UP1");
        assert_eq!(doc.data["committees"], json!(["UC1", "UC2"]));
        assert_eq!(doc.data["occurrences"].as_array().unwrap().len(), 1);
        assert_eq!(doc.fulltext, "TSC Weekly\nWeekly sync");
    }

    #[test]
    fn missing_topic_is_fatal() {
        let p = payload(json!({"start_time": "2024-01-01T10:00:00Z"}));
        assert!(matches!(
            meeting_doc(&p, None, &[]),
            Err(MapError::MissingField("topic"))
        ));
    }

    #[test]
    fn recurring_meeting_expands_occurrences() {
        let p = payload(json!({
            "topic": "Standup",
            "start_time": "2024-01-01T10:00:00Z",
            "recurrence": {"type": 1, "repeat_interval": 1, "end_times": 5},
        }));
        let doc = meeting_doc(&p, None, &[]).unwrap();
        assert_eq!(doc.data["occurrences"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn non_public_visibility_stays_private() {
        let p = payload(json!({"topic": "X", "visibility": "restricted"}));
        let doc = meeting_doc(&p, None, &[]).unwrap();
        assert!(!doc.public);
        assert_eq!(doc.data["visibility"], "private");
    }
}
