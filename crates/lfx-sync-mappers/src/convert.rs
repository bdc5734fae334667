//! Shared coercion helpers: URLs, dates, identity rewriting.

use chrono::{DateTime, NaiveDate, Utc};
use url::Url;

/// Cleans and validates a URL field. Trims, tolerates a missing scheme
/// (assumes https), rejects anything that is not http(s). Returns the
/// normalized form.
pub fn clean_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&candidate).ok()?;
    match url.scheme() {
        "http" | "https" => Some(url.to_string()),
        _ => None,
    }
}

/// Normalizes a v1 date or timestamp to RFC 3339 UTC. Accepts RFC 3339
/// with any offset and bare `YYYY-MM-DD` dates (midnight UTC). Anything
/// else is dropped.
pub fn normalize_date(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ts.with_timezone(&Utc).to_rfc3339());
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0)?;
        return Some(midnight.and_utc().to_rfc3339());
    }

    None
}

/// Rewrites a username into the authentication-subject form used in
/// access-control relations.
pub fn auth_subject(username: &str) -> String {
    format!("user:{}", username.trim())
}
