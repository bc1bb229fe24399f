//! Governorate listing parameters.

use serde::{Deserialize, Serialize};

use shipping_core::specification::{CriteriaBuilder, Include, PagingParams, QueryParams};
use shipping_core::types::Criteria;
use shipping_core::AppResult;

use super::model::Governorate;
use crate::city::City;

/// Filters accepted by the governorate listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernorateParams {
    /// Paging and sorting.
    #[serde(flatten)]
    pub paging: PagingParams,
    /// Case-insensitive name search.
    pub search: Option<String>,
    /// Soft-delete filter.
    pub is_deleted: Option<bool>,
    /// Attach the governorate's cities.
    #[serde(default)]
    pub with_cities: bool,
}

impl QueryParams for GovernorateParams {
    type Entity = Governorate;

    const SORT_KEYS: &'static [(&'static str, &'static str)] =
        &[("name", "name"), ("createdAt", "created_at")];

    fn paging(&self) -> &PagingParams {
        &self.paging
    }

    fn criteria(&self) -> AppResult<Option<Criteria>> {
        CriteriaBuilder::new()
            .contains_opt("name", self.search.as_deref())
            .eq_opt("is_deleted", self.is_deleted)
            .build()
    }

    fn includes(&self) -> Vec<Include> {
        if self.with_cities {
            vec![Include::collection::<City>("cities", "governorate_id")]
        } else {
            Vec::new()
        }
    }
}
