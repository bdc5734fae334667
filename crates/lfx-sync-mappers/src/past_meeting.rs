//! Past-meeting mappers: the meeting itself plus its artifacts
//! (participants, recordings, transcripts, summaries).

use serde_json::{Value, json};

use lfx_sync_types::Payload;

use crate::{IndexDoc, MapError, convert, enums, fulltext_of, summary};

/// Maps a completed meeting under its resolved source meeting.
pub fn past_meeting_doc(payload: &Payload, meeting_uid: &str) -> Result<IndexDoc, MapError> {
    let topic = payload
        .string_field("topic")
        .ok_or(MapError::MissingField("topic"))?;
    let public = enums::is_public_visibility(payload.str_field("visibility"));

    let data = json!({
        "topic": topic,
        "description": payload.str_field("description"),
        "start_time": payload.str_field("start_time"),
        "end_time": payload.str_field("end_time"),
        "duration": payload.i64_field("duration"),
        "timezone": payload.str_field("timezone"),
        "occurrence_id": payload.str_field("occurrence_id"),
        "participant_count": payload.i64_field("participant_count"),
        "meeting_uid": meeting_uid,
    });

    Ok(IndexDoc {
        sort_name: topic.clone(),
        name_and_aliases: vec![topic.clone()],
        fulltext: fulltext_of(&[Some(&topic), payload.str_field("description")]),
        public,
        data,
    })
}

/// Maps an invitee or attendee under its resolved past meeting. `role` is
/// decided by the record kind, not the payload.
pub fn participant_doc(
    payload: &Payload,
    past_meeting_uid: &str,
    role: &str,
) -> Result<IndexDoc, MapError> {
    let email = payload
        .string_field("email")
        .ok_or(MapError::MissingField("email"))?;
    let name = payload
        .string_field("name")
        .unwrap_or_else(|| email.clone());

    let data = json!({
        "email": email,
        "name": name,
        "role": role,
        "is_host": payload.bool_field("is_host").unwrap_or(false),
        "past_meeting_uid": past_meeting_uid,
    });

    Ok(IndexDoc {
        sort_name: name.clone(),
        name_and_aliases: vec![name, email],
        fulltext: role.to_string(),
        public: false,
        data,
    })
}

/// Maps a recording, splitting out a transcript document when the file
/// set carries transcript artifacts. Returns `(recording, transcript)`.
pub fn recording_doc(
    payload: &Payload,
    past_meeting_uid: &str,
) -> Result<(IndexDoc, Option<IndexDoc>), MapError> {
    let topic = payload
        .string_field("topic")
        .ok_or(MapError::MissingField("topic"))?;

    let files: Vec<Value> = payload
        .array_field("recording_files")
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .map(|o| {
                    let file = Payload::from_object(o.clone());
                    json!({
                        "download_url": file.str_field("download_url").and_then(convert::clean_url),
                        "play_url": file.str_field("play_url").and_then(convert::clean_url),
                        "file_type": file.str_field("file_type"),
                        "recording_type": file.str_field("recording_type"),
                        "recording_start": file.str_field("recording_start"),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let (transcripts, media): (Vec<Value>, Vec<Value>) =
        files.into_iter().partition(is_transcript_file);

    let recording = IndexDoc {
        sort_name: topic.clone(),
        name_and_aliases: vec![topic.clone()],
        fulltext: topic.clone(),
        public: false,
        data: json!({
            "topic": topic,
            "share_url": payload.str_field("share_url").and_then(convert::clean_url),
            "total_size": payload.i64_field("total_size"),
            "recording_files": media,
            "past_meeting_uid": past_meeting_uid,
        }),
    };

    let transcript = (!transcripts.is_empty()).then(|| IndexDoc {
        sort_name: topic.clone(),
        name_and_aliases: vec![topic.clone()],
        fulltext: topic.clone(),
        public: false,
        data: json!({
            "topic": topic,
            "transcript_files": transcripts,
            "past_meeting_uid": past_meeting_uid,
        }),
    });

    Ok((recording, transcript))
}

fn is_transcript_file(file: &Value) -> bool {
    let file_type = file["file_type"].as_str().unwrap_or("");
    let recording_type = file["recording_type"].as_str().unwrap_or("");
    file_type.eq_ignore_ascii_case("transcript")
        || file_type.eq_ignore_ascii_case("cc")
        || recording_type.eq_ignore_ascii_case("audio_transcript")
}

/// Maps an AI summary under its resolved past meeting. A record with no
/// usable summary content is a transformation error.
pub fn summary_doc(payload: &Payload, past_meeting_uid: &str) -> Result<IndexDoc, MapError> {
    let text =
        summary::coalesce_summary(payload).ok_or(MapError::MissingField("summary_overview"))?;
    let title = payload
        .string_field("summary_title")
        .unwrap_or_else(|| "Meeting summary".to_string());

    let data = json!({
        "title": title,
        "summary": text,
        "edited": payload.bool_field("edited").unwrap_or(false),
        "past_meeting_uid": past_meeting_uid,
    });

    Ok(IndexDoc {
        sort_name: title.clone(),
        name_and_aliases: vec![title],
        fulltext: text,
        public: false,
        data,
    })
}

/// The v1 id of the parent past meeting on artifact records.
pub fn parent_past_meeting_id(payload: &Payload) -> Option<String> {
    payload.string_field("past_meeting_id")
}

/// The v1 id of the source meeting on the past meeting itself.
pub fn parent_meeting_id(payload: &Payload) -> Option<String> {
    payload.string_field("meeting_id")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(value: serde_json::Value) -> Payload {
        Payload::from_object(value.as_object().unwrap().clone())
    }

    #[test]
    fn maps_past_meeting() {
        let p = payload(json!({
            "topic": "TSC Weekly",
            "start_time": "2024-01-01T10:00:00Z",
            "end_time": "2024-01-01T11:00:00Z",
            "participant_count": "12",
            "meeting_id": "M1",
        }));
        let doc = past_meeting_doc(&p, "UM1").unwrap();
        assert_eq!(doc.data["participant_count"], 12);
        assert_eq!(doc.data["meeting_uid"], "UM1");
    }

    #[test]
    fn participant_role_comes_from_kind() {
        let p = payload(json!({"email": "a@b.c", "name": "A B"}));
        let doc = participant_doc(&p, "UPM1", "attendee").unwrap();
        assert_eq!(doc.data["role"], "attendee");
        assert_eq!(doc.data["past_meeting_uid"], "UPM1");
    }

    #[test]
    fn recording_splits_transcript_files() {
        let p = payload(json!({
            "topic": "TSC Weekly",
            "recording_files": [
                {"file_type": "MP4", "recording_type": "shared_screen", "download_url": "https://x.example/a.mp4"},
                {"file_type": "TRANSCRIPT", "download_url": "https://x.example/a.vtt"},
            ],
        }));
        let (recording, transcript) = recording_doc(&p, "UPM1").unwrap();

        assert_eq!(recording.data["recording_files"].as_array().unwrap().len(), 1);
        let transcript = transcript.expect("transcript doc");
        assert_eq!(transcript.data["transcript_files"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn recording_without_transcripts_has_no_transcript_doc() {
        let p = payload(json!({
            "topic": "TSC Weekly",
            "recording_files": [{"file_type": "MP4"}],
        }));
        let (_, transcript) = recording_doc(&p, "UPM1").unwrap();
        assert!(transcript.is_none());
    }

    #[test]
    fn summary_requires_content() {
        let empty = payload(json!({"summary_overview": " "}));
        assert!(summary_doc(&empty, "UPM1").is_err());

        let p = payload(json!({"summary_overview": "We met."}));
        let doc = summary_doc(&p, "UPM1").unwrap();
        assert_eq!(doc.fulltext, "We met.");
        assert_eq!(doc.data["title"], "Meeting summary");
    }
}
