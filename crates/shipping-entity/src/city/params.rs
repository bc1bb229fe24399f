//! City listing parameters.

use serde::{Deserialize, Serialize};

use shipping_core::specification::{CriteriaBuilder, Include, PagingParams, QueryParams};
use shipping_core::types::{Criteria, GovernorateId};
use shipping_core::AppResult;

use super::model::City;
use crate::governorate::Governorate;

/// Filters accepted by the city listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityParams {
    /// Paging and sorting.
    #[serde(flatten)]
    pub paging: PagingParams,
    /// Case-insensitive name search.
    pub search: Option<String>,
    /// Restrict to one governorate.
    pub governorate_id: Option<GovernorateId>,
    /// Soft-delete filter.
    pub is_deleted: Option<bool>,
    /// Lowest shipping price (inclusive).
    pub min_shipping_price: Option<f64>,
    /// Highest shipping price (inclusive).
    pub max_shipping_price: Option<f64>,
}

impl QueryParams for CityParams {
    type Entity = City;

    const SORT_KEYS: &'static [(&'static str, &'static str)] = &[
        ("name", "name"),
        ("shippingPrice", "shipping_price"),
        ("createdAt", "created_at"),
        ("governorate", "governorate.name"),
    ];

    fn paging(&self) -> &PagingParams {
        &self.paging
    }

    fn criteria(&self) -> AppResult<Option<Criteria>> {
        CriteriaBuilder::new()
            .contains_opt("name", self.search.as_deref())
            .eq_opt("governorate_id", self.governorate_id)
            .eq_opt("is_deleted", self.is_deleted)
            .range_opt(
                "shipping_price",
                self.min_shipping_price,
                self.max_shipping_price,
            )
            .build()
    }

    fn includes(&self) -> Vec<Include> {
        vec![Include::reference::<Governorate>("governorate", "governorate_id")]
    }
}
