//! Content coalescing for sparse v1 meeting summaries.
//!
//! v1 splits AI meeting summaries across several optional fields (an
//! overview, a list of detail sections, a list of next steps). The v2
//! indexer wants one formatted text block; empty fields are skipped
//! entirely so sparse records do not produce headers over nothing.

use lfx_sync_types::Payload;

/// Coalesces the summary fields of a past-meeting summary payload into a
/// single formatted text block. Returns `None` when every field is empty.
pub fn coalesce_summary(payload: &Payload) -> Option<String> {
    let mut sections: Vec<String> = Vec::new();

    if let Some(title) = payload.str_field("summary_title") {
        sections.push(title.to_string());
    }

    if let Some(overview) = payload.str_field("summary_overview") {
        sections.push(overview.to_string());
    }

    let details: Vec<String> = payload
        .array_field("summary_details")
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let section = item.as_object()?;
                    let section = Payload::from_object(section.clone());
                    let label = section.str_field("label");
                    let text = section.str_field("summary")?;
                    Some(match label {
                        Some(label) => format!("{label}\n{text}"),
                        None => text.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    sections.extend(details);

    let steps = payload.string_list("next_steps");
    if !steps.is_empty() {
        let mut block = String::from("Next steps:");
        for step in steps {
            block.push_str("\n- ");
            block.push_str(&step);
        }
        sections.push(block);
    }

    if sections.is_empty() {
        None
    } else {
        Some(sections.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> Payload {
        Payload::from_object(value.as_object().unwrap().clone())
    }

    #[test]
    fn full_summary_is_ordered_and_separated() {
        let p = payload(json!({
            "summary_title": "Weekly sync",
            "summary_overview": "We discussed the release.",
            "summary_details": [
                {"label": "Release", "summary": "Ship on Friday."},
                {"summary": "Docs need review."},
            ],
            "next_steps": ["Tag rc1", "Update changelog"],
        }));

        let text = coalesce_summary(&p).unwrap();
        assert_eq!(
            text,
            "Weekly sync\n\nWe discussed the release.\n\nRelease\nShip on Friday.\n\nDocs need review.\n\nNext steps:\n- Tag rc1\n- Update changelog"
        );
    }

    #[test]
    fn sparse_summary_skips_empty_fields() {
        let p = payload(json!({
            "summary_overview": "Short call.",
            "summary_details": [],
            "next_steps": [],
        }));
        assert_eq!(coalesce_summary(&p).unwrap(), "Short call.");
    }

    #[test]
    fn empty_summary_is_none() {
        let p = payload(json!({"summary_overview": "  "}));
        assert_eq!(coalesce_summary(&p), None);
    }
}
