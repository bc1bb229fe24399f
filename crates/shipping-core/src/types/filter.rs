//! Filter types for dynamic query building.
//!
//! A filter is an explicit (field, operator, value) triple rather than a
//! closure, so every storage engine can translate it into its own query
//! language. Field names are dotted paths into the stored JSON document,
//! e.g. `"name"` or `"city.name"`.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Filter comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// Exact equality.
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// SQL `LIKE` pattern match.
    Like,
    /// SQL `ILIKE` case-insensitive pattern match.
    ILike,
    /// SQL `IN` list membership.
    In,
    /// SQL `IS NULL` check.
    IsNull,
    /// SQL `IS NOT NULL` check.
    IsNotNull,
}

/// A dynamic filter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// A boolean value.
    Boolean(bool),
    /// An integer value.
    Integer(i64),
    /// A floating-point value.
    Float(f64),
    /// A UUID, compared against the document's hyphenated string form.
    Uuid(Uuid),
    /// A UTC timestamp, compared against the document's RFC 3339 string form.
    Timestamp(DateTime<Utc>),
    /// A string value.
    String(String),
    /// A list of string values (for `IN` operator).
    StringList(Vec<String>),
    /// Null / no value (for `IS NULL`, `IS NOT NULL`).
    Null,
}

impl FilterValue {
    /// Compare a document value against this filter value.
    ///
    /// Returns the ordering of `value` relative to `self`, or `None` when
    /// the two are not comparable (type mismatch, null, unparsable string).
    pub fn compare_json(&self, value: &Value) -> Option<Ordering> {
        match (self, value) {
            (Self::Boolean(expected), Value::Bool(actual)) => Some(actual.cmp(expected)),
            (Self::Integer(expected), Value::Number(actual)) => match actual.as_i64() {
                Some(actual) => Some(actual.cmp(expected)),
                None => actual.as_f64()?.partial_cmp(&(*expected as f64)),
            },
            (Self::Float(expected), Value::Number(actual)) => actual.as_f64()?.partial_cmp(expected),
            (Self::Uuid(expected), Value::String(actual)) => {
                Uuid::parse_str(actual).ok().map(|actual| actual.cmp(expected))
            }
            (Self::Timestamp(expected), Value::String(actual)) => DateTime::parse_from_rfc3339(actual)
                .ok()
                .map(|actual| actual.with_timezone(&Utc).cmp(expected)),
            (Self::String(expected), Value::String(actual)) => {
                Some(actual.as_str().cmp(expected.as_str()))
            }
            _ => None,
        }
    }

    /// Compare two filter values of compatible kinds.
    ///
    /// Used to validate range bounds at specification-build time.
    pub fn partial_cmp_value(&self, other: &FilterValue) -> Option<Ordering> {
        match (self, other) {
            (Self::Boolean(a), Self::Boolean(b)) => Some(a.cmp(b)),
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Integer(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Self::Uuid(a), Self::Uuid(b)) => Some(a.cmp(b)),
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.cmp(b)),
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Render the value as the text a document stores for it.
    ///
    /// `None` for lists and null.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Boolean(v) => Some(v.to_string()),
            Self::Integer(v) => Some(v.to_string()),
            Self::Float(v) => Some(v.to_string()),
            Self::Uuid(v) => Some(v.to_string()),
            Self::Timestamp(v) => Some(v.to_rfc3339()),
            Self::String(v) => Some(v.clone()),
            Self::StringList(_) | Self::Null => None,
        }
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for FilterValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Uuid> for FilterValue {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(value: Vec<String>) -> Self {
        Self::StringList(value)
    }
}

/// A single filter condition on a named field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterField {
    /// The dotted document path to filter on.
    pub field: String,
    /// The comparison operator.
    pub op: FilterOp,
    /// The value to compare against.
    pub value: FilterValue,
}

impl FilterField {
    /// Create a new filter field.
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<FilterValue>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Shorthand for an equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    /// Shorthand for a case-insensitive LIKE filter.
    pub fn ilike(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(field, FilterOp::ILike, FilterValue::String(pattern.into()))
    }

    /// Case-insensitive substring match. Wildcards in `text` match literally.
    pub fn contains(field: impl Into<String>, text: &str) -> Self {
        Self::ilike(field, format!("%{}%", escape_like(text)))
    }

    /// Shorthand for an `IS NULL` check.
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOp::IsNull, FilterValue::Null)
    }

    /// Evaluate this condition against a stored document.
    ///
    /// Null semantics follow SQL: a missing or null field satisfies only
    /// `IsNull`.
    pub fn matches(&self, doc: &Value) -> bool {
        let found = lookup_path(doc, &self.field).filter(|v| !v.is_null());

        match (self.op, found) {
            (FilterOp::IsNull, found) => found.is_none(),
            (FilterOp::IsNotNull, found) => found.is_some(),
            (_, None) => false,
            (FilterOp::Eq, Some(value)) => self.value.compare_json(value) == Some(Ordering::Equal),
            (FilterOp::Ne, Some(value)) => matches!(
                self.value.compare_json(value),
                Some(Ordering::Less | Ordering::Greater)
            ),
            (FilterOp::Gt, Some(value)) => {
                self.value.compare_json(value) == Some(Ordering::Greater)
            }
            (FilterOp::Gte, Some(value)) => matches!(
                self.value.compare_json(value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            (FilterOp::Lt, Some(value)) => self.value.compare_json(value) == Some(Ordering::Less),
            (FilterOp::Lte, Some(value)) => matches!(
                self.value.compare_json(value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            (FilterOp::Like | FilterOp::ILike, Some(value)) => {
                let FilterValue::String(pattern) = &self.value else {
                    return false;
                };
                json_text(value).is_some_and(|text| {
                    like_match(pattern, &text, self.op == FilterOp::ILike)
                })
            }
            (FilterOp::In, Some(value)) => match &self.value {
                FilterValue::StringList(items) => {
                    json_text(value).is_some_and(|text| items.iter().any(|item| *item == text))
                }
                other => other.compare_json(value) == Some(Ordering::Equal),
            },
        }
    }
}

/// A composable boolean filter expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criteria {
    /// A single field condition.
    Field(FilterField),
    /// All sub-expressions must hold. An empty list matches everything.
    And(Vec<Criteria>),
    /// At least one sub-expression must hold. An empty list matches nothing.
    Or(Vec<Criteria>),
    /// The sub-expression must not hold.
    Not(Box<Criteria>),
}

impl Criteria {
    /// Evaluate this expression against a stored document.
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Self::Field(field) => field.matches(doc),
            Self::And(terms) => terms.iter().all(|term| term.matches(doc)),
            Self::Or(terms) => terms.iter().any(|term| term.matches(doc)),
            Self::Not(term) => !term.matches(doc),
        }
    }

    /// Conjoin two expressions, flattening nested `And`s.
    pub fn and(self, other: Criteria) -> Criteria {
        let mut terms = match self {
            Self::And(terms) => terms,
            single => vec![single],
        };
        match other {
            Self::And(more) => terms.extend(more),
            single => terms.push(single),
        }
        Self::And(terms)
    }

    /// Negate this expression.
    pub fn negate(self) -> Criteria {
        Self::Not(Box::new(self))
    }
}

impl From<FilterField> for Criteria {
    fn from(field: FilterField) -> Self {
        Self::Field(field)
    }
}

/// Resolve a dotted path inside a JSON document.
///
/// Only object members are traversed; arrays end the walk.
pub fn lookup_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(doc, |current, segment| current.as_object()?.get(segment))
}

/// Escape SQL `LIKE` wildcards so `text` matches literally.
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Match `text` against a SQL `LIKE` pattern (`%`, `_`, backslash escape).
pub fn like_match(pattern: &str, text: &str, case_insensitive: bool) -> bool {
    enum Token {
        Any,
        One,
        Literal(char),
    }

    let (pattern, text) = if case_insensitive {
        (pattern.to_lowercase(), text.to_lowercase())
    } else {
        (pattern.to_string(), text.to_string())
    };

    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => Token::Any,
            '_' => Token::One,
            '\\' => Token::Literal(chars.next().unwrap_or('\\')),
            c => Token::Literal(c),
        });
    }

    let text: Vec<char> = text.chars().collect();
    // reachable[i]: the tokens consumed so far can match text[..i]
    let mut reachable = vec![false; text.len() + 1];
    reachable[0] = true;

    for token in &tokens {
        let mut next = vec![false; text.len() + 1];
        match token {
            Token::Any => {
                let mut seen = false;
                for (i, slot) in next.iter_mut().enumerate() {
                    seen |= reachable[i];
                    *slot = seen;
                }
            }
            Token::One => {
                for i in 0..text.len() {
                    if reachable[i] {
                        next[i + 1] = true;
                    }
                }
            }
            Token::Literal(expected) => {
                for i in 0..text.len() {
                    if reachable[i] && text[i] == *expected {
                        next[i + 1] = true;
                    }
                }
            }
        }
        reachable = next;
    }

    reachable[text.len()]
}

fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn branch() -> Value {
        json!({
            "id": "8d3c9a4e-2f61-4c0b-9d8e-7a1b2c3d4e5f",
            "name": "Cairo Downtown",
            "is_deleted": false,
            "shipping_price": 45.5,
            "created_at": "2024-03-01T10:00:00Z",
            "manager": null,
            "city": { "name": "Cairo" }
        })
    }

    #[test]
    fn test_equality_and_inequality() {
        let doc = branch();
        assert!(FilterField::eq("is_deleted", false).matches(&doc));
        assert!(!FilterField::eq("is_deleted", true).matches(&doc));
        assert!(FilterField::new("name", FilterOp::Ne, "Giza").matches(&doc));
        assert!(FilterField::eq("city.name", "Cairo").matches(&doc));
    }

    #[test]
    fn test_null_semantics() {
        let doc = branch();
        assert!(FilterField::is_null("manager").matches(&doc));
        assert!(FilterField::is_null("missing").matches(&doc));
        assert!(!FilterField::new("manager", FilterOp::Ne, "x").matches(&doc));
        assert!(!FilterField::new("manager", FilterOp::IsNotNull, FilterValue::Null).matches(&doc));
    }

    #[test]
    fn test_numeric_and_timestamp_ranges() {
        let doc = branch();
        assert!(FilterField::new("shipping_price", FilterOp::Gte, 45.5).matches(&doc));
        assert!(FilterField::new("shipping_price", FilterOp::Gt, 45i64).matches(&doc));
        assert!(!FilterField::new("shipping_price", FilterOp::Lt, 10i64).matches(&doc));

        let cutoff: DateTime<Utc> = "2024-02-01T00:00:00Z".parse().expect("timestamp");
        assert!(FilterField::new("created_at", FilterOp::Gt, cutoff).matches(&doc));
    }

    #[test]
    fn test_uuid_match() {
        let doc = branch();
        let id = Uuid::parse_str("8d3c9a4e-2f61-4c0b-9d8e-7a1b2c3d4e5f").expect("uuid");
        assert!(FilterField::eq("id", id).matches(&doc));
        assert!(!FilterField::eq("id", Uuid::nil()).matches(&doc));
    }

    #[test]
    fn test_contains_is_case_insensitive_and_literal() {
        let doc = json!({ "name": "50%_off Store" });
        assert!(FilterField::contains("name", "OFF").matches(&doc));
        assert!(FilterField::contains("name", "%_").matches(&doc));
        assert!(!FilterField::contains("name", "x%").matches(&doc));
    }

    #[test]
    fn test_like_patterns() {
        assert!(like_match("Ca%", "Cairo", false));
        assert!(!like_match("ca%", "Cairo", false));
        assert!(like_match("ca%", "Cairo", true));
        assert!(like_match("C_iro", "Cairo", false));
        assert!(like_match("%", "", false));
        assert!(!like_match("_", "", false));
    }

    #[test]
    fn test_in_list() {
        let doc = json!({ "status": "delivered" });
        let filter = FilterField::new(
            "status",
            FilterOp::In,
            vec!["new".to_string(), "delivered".to_string()],
        );
        assert!(filter.matches(&doc));
    }

    #[test]
    fn test_criteria_composition() {
        let doc = branch();
        let criteria = Criteria::from(FilterField::eq("is_deleted", false))
            .and(FilterField::contains("name", "cairo").into());
        assert!(criteria.matches(&doc));
        assert!(!criteria.clone().negate().matches(&doc));
        assert!(Criteria::And(vec![]).matches(&doc));
        assert!(!Criteria::Or(vec![]).matches(&doc));

        let flattened = criteria.and(FilterField::is_null("manager").into());
        match flattened {
            Criteria::And(terms) => assert_eq!(terms.len(), 3),
            other => panic!("expected flattened And, got {other:?}"),
        }
    }
}
