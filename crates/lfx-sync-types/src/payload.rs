//! Dynamic access to v1 record payloads.
//!
//! The v1 schema is not authoritative and varies across record kinds, so a
//! payload is kept as a plain JSON object and each mapper extracts the
//! fields it consumes with explicit coercion. v1 stores many numerics as
//! strings; the coercing getters accept both and drop values that fit
//! neither shape.

use serde_json::{Map, Value};

/// A v1 record payload: a dynamic mapping from field names to JSON values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload(Map<String, Value>);

impl Payload {
    /// Parses a payload from raw bytes. Anything but a JSON object is an error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice::<Map<String, Value>>(bytes).map(Self)
    }

    /// Wraps an already-parsed JSON object.
    pub fn from_object(object: Map<String, Value>) -> Self {
        Self(object)
    }

    /// Raw field access.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Returns the underlying object.
    pub fn as_object(&self) -> &Map<String, Value> {
        &self.0
    }

    /// A non-empty string field, trimmed. Empty and whitespace-only values
    /// are treated as absent, matching how v1 "clears" fields.
    pub fn str_field(&self, field: &str) -> Option<&str> {
        match self.0.get(field) {
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then_some(trimmed)
            }
            _ => None,
        }
    }

    /// An owned copy of [`Self::str_field`].
    pub fn string_field(&self, field: &str) -> Option<String> {
        self.str_field(field).map(str::to_string)
    }

    /// An integer field, accepting JSON numbers and numeric strings.
    pub fn i64_field(&self, field: &str) -> Option<i64> {
        match self.0.get(field)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// A float field, accepting JSON numbers and numeric strings.
    pub fn f64_field(&self, field: &str) -> Option<f64> {
        match self.0.get(field)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// A boolean field, accepting JSON booleans and "true"/"false" strings.
    pub fn bool_field(&self, field: &str) -> Option<bool> {
        match self.0.get(field)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// An array field.
    pub fn array_field(&self, field: &str) -> Option<&Vec<Value>> {
        self.0.get(field).and_then(Value::as_array)
    }

    /// A nested object field.
    pub fn object_field(&self, field: &str) -> Option<&Map<String, Value>> {
        self.0.get(field).and_then(Value::as_object)
    }

    /// The non-empty string elements of an array field.
    pub fn string_list(&self, field: &str) -> Vec<String> {
        self.array_field(field)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Sentinel check for skip flags: `true`, `"true"`, `"1"`, and `1` all
    /// count as set. Anything else, including absence, does not.
    pub fn is_truthy(&self, field: &str) -> bool {
        match self.0.get(field) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_i64() == Some(1),
            Some(Value::String(s)) => {
                let s = s.trim();
                s.eq_ignore_ascii_case("true") || s == "1"
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        Payload::from_bytes(value.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn rejects_non_objects() {
        assert!(Payload::from_bytes(b"[]").is_err());
        assert!(Payload::from_bytes(b"\"x\"").is_err());
        assert!(Payload::from_bytes(b"not json").is_err());
    }

    #[test]
    fn str_field_trims_and_drops_empty() {
        let p = payload(json!({"a": "  hi  ", "b": "   ", "c": 3}));
        assert_eq!(p.str_field("a"), Some("hi"));
        assert_eq!(p.str_field("b"), None);
        assert_eq!(p.str_field("c"), None);
        assert_eq!(p.str_field("missing"), None);
    }

    #[test]
    fn i64_field_coerces_strings() {
        let p = payload(json!({"n": 41, "s": "42", "bad": "4x2", "f": 1.5}));
        assert_eq!(p.i64_field("n"), Some(41));
        assert_eq!(p.i64_field("s"), Some(42));
        assert_eq!(p.i64_field("bad"), None);
        assert_eq!(p.i64_field("f"), None);
    }

    #[test]
    fn bool_field_coerces_strings() {
        let p = payload(json!({"t": true, "s": "TRUE", "f": "false", "x": "yes"}));
        assert_eq!(p.bool_field("t"), Some(true));
        assert_eq!(p.bool_field("s"), Some(true));
        assert_eq!(p.bool_field("f"), Some(false));
        assert_eq!(p.bool_field("x"), None);
    }

    #[test]
    fn string_list_filters_non_strings() {
        let p = payload(json!({"tags": ["a", "", 3, " b "]}));
        assert_eq!(p.string_list("tags"), vec!["a".to_string(), "b".to_string()]);
        assert!(p.string_list("missing").is_empty());
    }

    #[test]
    fn truthy_variants() {
        let p = payload(json!({"a": true, "b": "1", "c": "True", "d": 1, "e": 0, "f": "no"}));
        assert!(p.is_truthy("a"));
        assert!(p.is_truthy("b"));
        assert!(p.is_truthy("c"));
        assert!(p.is_truthy("d"));
        assert!(!p.is_truthy("e"));
        assert!(!p.is_truthy("f"));
        assert!(!p.is_truthy("missing"));
    }
}
