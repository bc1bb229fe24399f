//! Incremental construction of filter criteria from optional inputs.

use std::cmp::Ordering;

use crate::error::AppError;
use crate::result::AppResult;
use crate::types::filter::{Criteria, FilterField, FilterOp, FilterValue};

/// Accumulates optional filter terms into one conjunction.
///
/// `None` inputs never add a term. An explicit value always does, even
/// `false`, `0`, or an empty exact-match string. Free-text search is the
/// one exception: a blank search string adds nothing, since matching
/// `"%%"` would select every row anyway.
#[derive(Debug, Default)]
pub struct CriteriaBuilder {
    terms: Vec<Criteria>,
    error: Option<AppError>,
}

impl CriteriaBuilder {
    /// Start an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an arbitrary term.
    pub fn term(mut self, criteria: impl Into<Criteria>) -> Self {
        self.terms.push(criteria.into());
        self
    }

    /// Require `field == value`.
    pub fn eq(self, field: &str, value: impl Into<FilterValue>) -> Self {
        self.term(FilterField::eq(field, value))
    }

    /// Require `field == value` when a value is supplied.
    pub fn eq_opt<V: Into<FilterValue>>(self, field: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.eq(field, value),
            None => self,
        }
    }

    /// Exclude soft-deleted rows.
    pub fn not_deleted(self) -> Self {
        self.eq("is_deleted", false)
    }

    /// Require membership in `values` when supplied. An explicit empty
    /// list matches nothing.
    pub fn in_opt(self, field: &str, values: Option<Vec<String>>) -> Self {
        match values {
            Some(values) => self.term(FilterField::new(field, FilterOp::In, values)),
            None => self,
        }
    }

    /// Case-insensitive substring match on one field.
    pub fn contains_opt(self, field: &str, text: Option<&str>) -> Self {
        self.search_any(&[field], text)
    }

    /// Case-insensitive substring match on any of `fields`.
    pub fn search_any(self, fields: &[&str], text: Option<&str>) -> Self {
        let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
            return self;
        };
        let mut alternatives: Vec<Criteria> = fields
            .iter()
            .map(|field| FilterField::contains(*field, text).into())
            .collect();
        match alternatives.len() {
            0 => self,
            1 => self.term(alternatives.remove(0)),
            _ => self.term(Criteria::Or(alternatives)),
        }
    }

    /// Inclusive range on `field`. Either bound may be absent.
    ///
    /// A lower bound above the upper bound fails the build with
    /// `InvalidSpecification` instead of silently selecting nothing.
    pub fn range_opt<V: Into<FilterValue>>(
        mut self,
        field: &str,
        min: Option<V>,
        max: Option<V>,
    ) -> Self {
        let min = min.map(Into::into);
        let max = max.map(Into::into);

        if let (Some(low), Some(high)) = (&min, &max) {
            match low.partial_cmp_value(high) {
                Some(Ordering::Greater) => {
                    self.fail(format!("Range on '{field}' has minimum above maximum"));
                    return self;
                }
                None => {
                    self.fail(format!("Range bounds on '{field}' are not comparable"));
                    return self;
                }
                _ => {}
            }
        }

        if let Some(low) = min {
            self.terms
                .push(FilterField::new(field, FilterOp::Gte, low).into());
        }
        if let Some(high) = max {
            self.terms
                .push(FilterField::new(field, FilterOp::Lte, high).into());
        }
        self
    }

    /// Finish: `None` when no term was added (match-all).
    pub fn build(mut self) -> AppResult<Option<Criteria>> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Ok(match self.terms.len() {
            0 => None,
            1 => self.terms.pop(),
            _ => Some(Criteria::And(self.terms)),
        })
    }

    fn fail(&mut self, message: String) {
        if self.error.is_none() {
            self.error = Some(AppError::invalid_specification(message));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_absent_values_add_nothing() {
        let criteria = CriteriaBuilder::new()
            .eq_opt::<bool>("is_deleted", None)
            .contains_opt("name", None)
            .range_opt::<f64>("price", None, None)
            .build()
            .expect("valid");
        assert_eq!(criteria, None);
    }

    #[test]
    fn test_explicit_false_adds_term() {
        let criteria = CriteriaBuilder::new()
            .eq_opt("is_deleted", Some(false))
            .build()
            .expect("valid");
        assert_eq!(
            criteria,
            Some(Criteria::Field(FilterField::eq("is_deleted", false)))
        );
    }

    #[test]
    fn test_blank_search_is_ignored_but_empty_exact_match_is_kept() {
        let criteria = CriteriaBuilder::new()
            .contains_opt("name", Some("   "))
            .eq_opt("code", Some(""))
            .build()
            .expect("valid");
        assert_eq!(criteria, Some(Criteria::Field(FilterField::eq("code", ""))));
    }

    #[test]
    fn test_search_any_builds_disjunction() {
        let criteria = CriteriaBuilder::new()
            .search_any(&["customer_name", "customer_phone"], Some("010"))
            .build()
            .expect("valid")
            .expect("term");
        match criteria {
            Criteria::Or(terms) => assert_eq!(terms.len(), 2),
            other => panic!("expected Or, got {other:?}"),
        }
    }

    #[test]
    fn test_inverted_range_is_invalid() {
        let err = CriteriaBuilder::new()
            .range_opt("total_cost", Some(500.0), Some(100.0))
            .build()
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidSpecification);
    }

    #[test]
    fn test_range_produces_two_terms() {
        let criteria = CriteriaBuilder::new()
            .range_opt("total_cost", Some(100.0), Some(500.0))
            .build()
            .expect("valid");
        match criteria {
            Some(Criteria::And(terms)) => assert_eq!(terms.len(), 2),
            other => panic!("expected And, got {other:?}"),
        }
    }
}
