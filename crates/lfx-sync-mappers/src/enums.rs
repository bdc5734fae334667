//! Enum whitelists with deterministic fallbacks.
//!
//! v1 picklists drift over time; every whitelist maps unknown values to a
//! fixed fallback rather than failing the record.

/// Committee categories the v2 committee service accepts.
const COMMITTEE_CATEGORIES: &[&str] = &[
    "Board",
    "Budget Committee",
    "Code of Conduct",
    "Committers/Contributors",
    "Finance Committee",
    "Governing Board",
    "Legal Committee",
    "Marketing Committee",
    "Product Security",
    "Technical Advisory Committee",
    "Technical Oversight Committee",
    "Technical Steering Committee",
    "Other",
];

/// The v1 combined TOC/TAC picklist value that must be disambiguated by
/// committee name.
const COMBINED_TOC_TAC: &str = "Technical Oversight Committee/Technical Advisory Committee";

/// Maps a v1 `type__c` value to a v2 committee category.
///
/// The combined TOC/TAC value resolves to "Technical Advisory Committee"
/// iff the committee name contains "advisory" or "tac" (case-insensitive),
/// else "Technical Oversight Committee". Unknown values map to "Other".
pub fn committee_category(raw: Option<&str>, committee_name: &str) -> &'static str {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return "Other";
    };

    if raw == COMBINED_TOC_TAC {
        let name = committee_name.to_lowercase();
        return if name.contains("advisory") || name.contains("tac") {
            "Technical Advisory Committee"
        } else {
            "Technical Oversight Committee"
        };
    }

    COMMITTEE_CATEGORIES
        .iter()
        .find(|c| c.eq_ignore_ascii_case(raw))
        .copied()
        .unwrap_or("Other")
}

/// Member roles the v2 committee service accepts.
const MEMBER_ROLES: &[&str] = &[
    "Chair",
    "Counsel",
    "Developer Seat",
    "Director",
    "Lead",
    "Member",
    "Secretary",
    "Treasurer",
    "Vice Chair",
    "None",
];

/// Maps a v1 `role__c` value to a v2 member role. Unknown → "None".
pub fn member_role(raw: Option<&str>) -> &'static str {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return "None";
    };
    MEMBER_ROLES
        .iter()
        .find(|r| r.eq_ignore_ascii_case(raw))
        .copied()
        .unwrap_or("None")
}

/// Project types the v2 project service accepts. Unknown → "Project".
const PROJECT_TYPES: &[&str] = &["Project", "Project Group", "Working Group"];

pub fn project_type(raw: Option<&str>) -> &'static str {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return "Project";
    };
    PROJECT_TYPES
        .iter()
        .find(|t| t.eq_ignore_ascii_case(raw))
        .copied()
        .unwrap_or("Project")
}

/// Meeting visibility: only an explicit "public" value makes the record
/// public; everything else stays private.
pub fn is_public_visibility(raw: Option<&str>) -> bool {
    raw.map(str::trim)
        .is_some_and(|v| v.eq_ignore_ascii_case("public"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_category_passes_through() {
        assert_eq!(committee_category(Some("Governing Board"), "x"), "Governing Board");
        assert_eq!(committee_category(Some("governing board"), "x"), "Governing Board");
    }

    #[test]
    fn unknown_category_falls_back_to_other() {
        assert_eq!(committee_category(Some("Steering Circle"), "x"), "Other");
        assert_eq!(committee_category(None, "x"), "Other");
        assert_eq!(committee_category(Some("  "), "x"), "Other");
    }

    #[test]
    fn combined_toc_tac_disambiguates_by_name() {
        assert_eq!(
            committee_category(Some(COMBINED_TOC_TAC), "Technical Advisory Board"),
            "Technical Advisory Committee"
        );
        assert_eq!(
            committee_category(Some(COMBINED_TOC_TAC), "Project TAC"),
            "Technical Advisory Committee"
        );
        assert_eq!(
            committee_category(Some(COMBINED_TOC_TAC), "Oversight Group"),
            "Technical Oversight Committee"
        );
    }

    #[test]
    fn unknown_role_falls_back_to_none() {
        assert_eq!(member_role(Some("Chair")), "Chair");
        assert_eq!(member_role(Some("Grand Vizier")), "None");
        assert_eq!(member_role(None), "None");
    }

    #[test]
    fn project_type_fallback() {
        assert_eq!(project_type(Some("Project Group")), "Project Group");
        assert_eq!(project_type(Some("Megaproject")), "Project");
        assert_eq!(project_type(None), "Project");
    }

    #[test]
    fn visibility_defaults_private() {
        assert!(is_public_visibility(Some("public")));
        assert!(is_public_visibility(Some("PUBLIC")));
        assert!(!is_public_visibility(Some("private")));
        assert!(!is_public_visibility(None));
    }
}
