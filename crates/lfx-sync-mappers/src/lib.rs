//! Field-level v1→v2 transformations, one mapper per record kind.
//!
//! Mappers are pure: they consume a dynamic v1 payload plus whatever
//! resolved context the handler passes in (parent v2 ids, cross-lookup
//! results) and produce either a typed REST payload or an index document.
//! Coercion is explicit — v1 stores many numerics as strings — and enum
//! values are whitelisted with deterministic fallbacks.

pub mod committee;
pub mod convert;
pub mod enums;
pub mod meeting;
pub mod member;
pub mod past_meeting;
pub mod project;
pub mod recurrence;
pub mod registrant;
pub mod summary;
pub mod survey;
pub mod vote;

use serde_json::Value;
use thiserror::Error;

/// Transformation errors. Fatal per record: the event is acked and logged.
#[derive(Debug, Error)]
pub enum MapError {
    /// A field the target schema cannot do without was absent or empty.
    #[error("missing required field {0:?}")]
    MissingField(&'static str),

    /// A field was present but unusable.
    #[error("invalid field {field:?}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// The mapped output for publish-backed kinds: the document body plus the
/// naming/search projections the indexer envelope needs.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDoc {
    pub data: Value,
    pub sort_name: String,
    pub name_and_aliases: Vec<String>,
    pub fulltext: String,
    pub public: bool,
}

/// Field-equality diff used by the REST upsert paths: two objects agree
/// when every listed field is equal, with absent and `null` treated as
/// the same thing. Fields outside the list (server-managed timestamps,
/// audit columns) never trigger an update.
pub fn base_fields_equal(ours: &Value, theirs: &Value, fields: &[&str]) -> bool {
    fields.iter().all(|field| {
        let a = ours.get(field).unwrap_or(&Value::Null);
        let b = theirs.get(field).unwrap_or(&Value::Null);
        a == b
    })
}

/// Joins non-empty text fragments into one fulltext projection.
pub(crate) fn fulltext_of(parts: &[Option<&str>]) -> String {
    parts
        .iter()
        .filter_map(|p| *p)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn equal_fields_ignore_extras() {
        let ours = json!({"name": "X", "slug": "x"});
        let theirs = json!({"name": "X", "slug": "x", "updated_at": "now"});
        assert!(base_fields_equal(&ours, &theirs, &["name", "slug"]));
    }

    #[test]
    fn absent_and_null_agree() {
        let ours = json!({"name": "X", "description": null});
        let theirs = json!({"name": "X"});
        assert!(base_fields_equal(&ours, &theirs, &["name", "description"]));
    }

    #[test]
    fn differing_field_detected() {
        let ours = json!({"name": "X"});
        let theirs = json!({"name": "Y"});
        assert!(!base_fields_equal(&ours, &theirs, &["name"]));
    }

    #[test]
    fn fulltext_skips_empties() {
        assert_eq!(
            fulltext_of(&[Some("a"), None, Some("  "), Some("b")]),
            "a\nb"
        );
    }
}
