//! Mapping-bucket key and value shapes.
//!
//! Forward: `{kind}.sfid.{v1id}` → v2 id. Reverse: `{kind}.uid.{v2id}` →
//! `{v1parent}:{v1id}`. Compound values (committee member mappings, reverse
//! paths) join their segments with a colon; the v1/v2 id alphabets never
//! contain one.

use lfx_sync_types::RecordKind;

/// Forward mapping key for a v1 id.
pub fn forward_key(kind: RecordKind, v1_id: &str) -> String {
    format!("{}.sfid.{v1_id}", kind.mapping_kind())
}

/// Reverse mapping key for a v2 id.
pub fn reverse_key(kind: RecordKind, v2_id: &str) -> String {
    format!("{}.uid.{v2_id}", kind.mapping_kind())
}

/// Reverse mapping value: `{parent}:{id}`, or the bare id when the record
/// has no parent path.
pub fn reverse_value(parent: Option<&str>, v1_id: &str) -> String {
    match parent {
        Some(parent) if !parent.is_empty() => format!("{parent}:{v1_id}"),
        _ => v1_id.to_string(),
    }
}

/// Joins a compound mapping value (`{parent}:{id}`).
pub fn join_compound(parent: &str, id: &str) -> String {
    format!("{parent}:{id}")
}

/// Key of the cumulative committee index for a meeting. The value is a
/// JSON map keyed by a per-join UUID (see `CommitteeIndex`); joins
/// accumulate here across events.
pub fn committee_index_key(meeting_v1_id: &str) -> String {
    format!("meeting_committees.index.{meeting_v1_id}")
}

/// Splits a compound mapping value into `(parent, id)`.
///
/// Values written before the format change carry no parent segment; those
/// decode as `(None, id)` and are upgraded in place on the next successful
/// upsert.
pub fn split_compound(value: &str) -> (Option<&str>, &str) {
    match value.split_once(':') {
        Some((parent, id)) => (Some(parent), id),
        None => (None, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_and_reverse_keys() {
        assert_eq!(forward_key(RecordKind::Project, "P001"), "project.sfid.P001");
        assert_eq!(reverse_key(RecordKind::Project, "U1"), "project.uid.U1");
        assert_eq!(
            forward_key(RecordKind::CommitteeMember, "M7"),
            "committee_member.sfid.M7"
        );
    }

    #[test]
    fn reverse_value_with_and_without_parent() {
        assert_eq!(reverse_value(Some("P001"), "C9"), "P001:C9");
        assert_eq!(reverse_value(None, "P001"), "P001");
        assert_eq!(reverse_value(Some(""), "P001"), "P001");
    }

    #[test]
    fn committee_index_key_is_meeting_scoped() {
        assert_eq!(committee_index_key("M1"), "meeting_committees.index.M1");
    }

    #[test]
    fn compound_round_trip() {
        let value = join_compound("CU1", "MU2");
        assert_eq!(split_compound(&value), (Some("CU1"), "MU2"));
    }

    #[test]
    fn legacy_value_decodes_without_parent() {
        assert_eq!(split_compound("MU2"), (None, "MU2"));
    }
}
