//! Branch listing parameters.

use serde::{Deserialize, Serialize};

use shipping_core::specification::{CriteriaBuilder, Include, PagingParams, QueryParams};
use shipping_core::types::{CityId, Criteria};
use shipping_core::AppResult;

use super::model::Branch;
use crate::city::City;

/// Filters accepted by the branch listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchParams {
    /// Paging and sorting.
    #[serde(flatten)]
    pub paging: PagingParams,
    /// Case-insensitive name search.
    pub search: Option<String>,
    /// Restrict to one city.
    pub city_id: Option<CityId>,
    /// Soft-delete filter.
    pub is_deleted: Option<bool>,
}

impl QueryParams for BranchParams {
    type Entity = Branch;

    const SORT_KEYS: &'static [(&'static str, &'static str)] = &[
        ("name", "name"),
        ("createdAt", "created_at"),
        ("city", "city.name"),
    ];

    fn paging(&self) -> &PagingParams {
        &self.paging
    }

    fn criteria(&self) -> AppResult<Option<Criteria>> {
        CriteriaBuilder::new()
            .contains_opt("name", self.search.as_deref())
            .eq_opt("city_id", self.city_id)
            .eq_opt("is_deleted", self.is_deleted)
            .build()
    }

    fn includes(&self) -> Vec<Include> {
        vec![Include::reference::<City>("city", "city_id")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipping_core::{CountSpecification, Specification};

    #[test]
    fn test_query_string_shape() {
        let params: BranchParams = serde_json::from_str(
            r#"{"pageIndex": 2, "pageSize": 10, "sort": "name_desc", "isDeleted": false}"#,
        )
        .expect("deserialize");
        assert_eq!(params.paging.page_index, Some(2));
        assert_eq!(params.is_deleted, Some(false));
        assert_eq!(params.search, None);
    }

    #[test]
    fn test_specifications_share_one_filter() {
        let params = BranchParams {
            paging: PagingParams::new(3, 5).sorted("city_asc"),
            search: Some("nasr".to_string()),
            city_id: Some(CityId::new()),
            is_deleted: Some(false),
        };
        let spec = Specification::from_params(&params).expect("valid");
        let count = CountSpecification::from_params(&params).expect("valid");

        assert_eq!(count.criteria(), spec.criteria());
        assert_eq!(spec.includes().len(), 1);
        assert_eq!(spec.order().map(|o| o.field.as_str()), Some("city.name"));
    }
}
