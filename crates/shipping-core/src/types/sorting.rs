//! Sorting types for list queries.

use serde::{Deserialize, Serialize};

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl SortDirection {
    /// Return the SQL keyword for this direction.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Parse `"asc"` / `"desc"` (case-insensitive).
    pub fn parse(text: &str) -> Option<Self> {
        if text.eq_ignore_ascii_case("asc") {
            Some(Self::Asc)
        } else if text.eq_ignore_ascii_case("desc") {
            Some(Self::Desc)
        } else {
            None
        }
    }
}

/// A sort specification consisting of a field name and direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    /// Dotted document path to sort by.
    pub field: String,
    /// Sort direction.
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortField {
    /// Create a new sort field.
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Create an ascending sort on the given field.
    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    /// Create a descending sort on the given field.
    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }

    /// Parse a `"{field}_{asc|desc}"` sort string.
    ///
    /// The direction is taken from the last underscore, so multi-word
    /// fields such as `created_at_desc` parse. A bare field name sorts
    /// ascending. Returns `None` for blank input.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        match text.rsplit_once('_') {
            Some((field, direction)) if !field.is_empty() => match SortDirection::parse(direction) {
                Some(direction) => Some(Self::new(field, direction)),
                None => Some(Self::asc(text)),
            },
            _ => Some(Self::asc(text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field_and_direction() {
        assert_eq!(SortField::parse("name_desc"), Some(SortField::desc("name")));
        assert_eq!(SortField::parse("name_ASC"), Some(SortField::asc("name")));
        assert_eq!(
            SortField::parse("createdAt_desc"),
            Some(SortField::desc("createdAt"))
        );
        assert_eq!(
            SortField::parse("created_at_desc"),
            Some(SortField::desc("created_at"))
        );
    }

    #[test]
    fn test_parse_without_direction() {
        assert_eq!(SortField::parse("name"), Some(SortField::asc("name")));
        assert_eq!(SortField::parse("created_at"), Some(SortField::asc("created_at")));
        assert_eq!(SortField::parse("   "), None);
        assert_eq!(SortField::parse("_desc"), Some(SortField::asc("_desc")));
    }
}
