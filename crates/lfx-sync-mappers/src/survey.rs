//! Survey and survey-response mappers.
//!
//! Survey records are loosely parented: any of survey, project, and
//! committee references may be present, and all that resolve are injected.

use serde_json::json;

use lfx_sync_types::Payload;

use crate::{IndexDoc, MapError, fulltext_of};

/// Resolved parent references for survey records. All optional; injection
/// is best-effort.
#[derive(Debug, Clone, Default)]
pub struct SurveyRefs {
    pub survey_uid: Option<String>,
    pub project_uid: Option<String>,
    pub committee_uid: Option<String>,
}

pub fn survey_doc(payload: &Payload, refs: &SurveyRefs) -> Result<IndexDoc, MapError> {
    let name = payload
        .string_field("name")
        .ok_or(MapError::MissingField("name"))?;

    let data = json!({
        "name": name,
        "description": payload.str_field("description"),
        "status": payload.str_field("status"),
        "project_uid": refs.project_uid,
        "committee_uid": refs.committee_uid,
    });

    Ok(IndexDoc {
        sort_name: name.clone(),
        name_and_aliases: vec![name.clone()],
        fulltext: fulltext_of(&[Some(&name), payload.str_field("description")]),
        public: false,
        data,
    })
}

pub fn survey_response_doc(payload: &Payload, refs: &SurveyRefs) -> Result<IndexDoc, MapError> {
    let survey_id = payload
        .string_field("survey_id")
        .ok_or(MapError::MissingField("survey_id"))?;
    let respondent = payload
        .string_field("respondent_email")
        .ok_or(MapError::MissingField("respondent_email"))?;

    let data = json!({
        "survey_id": survey_id,
        "respondent_email": respondent,
        "submitted_at": payload.str_field("submitted_at"),
        "survey_uid": refs.survey_uid,
        "project_uid": refs.project_uid,
        "committee_uid": refs.committee_uid,
    });

    Ok(IndexDoc {
        sort_name: respondent.clone(),
        name_and_aliases: vec![respondent],
        fulltext: String::new(),
        public: false,
        data,
    })
}

pub fn parent_survey_id(payload: &Payload) -> Option<String> {
    payload.string_field("survey_id")
}

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
    fn survey_injects_resolved_refs_only() {
        let p = payload(json!({"name": "Annual survey", "project_id": "P1"}));
        let refs = SurveyRefs {
            project_uid: Some("UP1".to_string()),
            ..SurveyRefs::default()
        };
        let doc = survey_doc(&p, &refs).unwrap();
        assert_eq!(doc.data["project_uid"], "UP1");
        assert!(doc.data["committee_uid"].is_null());
    }

    #[test]
    fn response_carries_survey_ref() {
        let p = payload(json!({
            "survey_id": "S1",
            "respondent_email": "a@b.c",
        }));
        let refs = SurveyRefs {
            survey_uid: Some("US1".to_string()),
            ..SurveyRefs::default()
        };
        let doc = survey_response_doc(&p, &refs).unwrap();
        assert_eq!(doc.data["survey_uid"], "US1");
    }

    #[test]
    fn response_without_respondent_is_fatal() {
        let p = payload(json!({"survey_id": "S1"}));
        assert!(survey_response_doc(&p, &SurveyRefs::default()).is_err());
    }
}
