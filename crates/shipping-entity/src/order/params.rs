//! Order listing parameters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shipping_core::specification::{CriteriaBuilder, Include, PagingParams, QueryParams};
use shipping_core::types::{BranchId, CityId, Criteria, MerchantId, RepresentativeId};
use shipping_core::AppResult;

use super::model::{Order, OrderStatus};
use crate::branch::Branch;
use crate::city::City;
use crate::merchant::Merchant;

/// Filters accepted by the order listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderParams {
    /// Paging and sorting.
    #[serde(flatten)]
    pub paging: PagingParams,
    /// Case-insensitive search over customer name and phone.
    pub search: Option<String>,
    /// Orders placed by one merchant.
    pub merchant_id: Option<MerchantId>,
    /// Orders assigned to one representative.
    pub representative_id: Option<RepresentativeId>,
    /// Orders handled by one branch.
    pub branch_id: Option<BranchId>,
    /// Orders delivered to one city.
    pub city_id: Option<CityId>,
    /// Any of these statuses.
    pub statuses: Option<Vec<OrderStatus>>,
    /// Soft-delete filter.
    pub is_deleted: Option<bool>,
    /// Lowest total cost (inclusive).
    pub min_cost: Option<f64>,
    /// Highest total cost (inclusive).
    pub max_cost: Option<f64>,
    /// Created at or after.
    pub from_date: Option<DateTime<Utc>>,
    /// Created at or before.
    pub to_date: Option<DateTime<Utc>>,
}

impl QueryParams for OrderParams {
    type Entity = Order;

    const SORT_KEYS: &'static [(&'static str, &'static str)] = &[
        ("createdAt", "created_at"),
        ("totalCost", "total_cost"),
        ("customerName", "customer_name"),
        ("status", "status"),
        ("merchant", "merchant.store_name"),
        ("city", "city.name"),
    ];

    fn paging(&self) -> &PagingParams {
        &self.paging
    }

    fn criteria(&self) -> AppResult<Option<Criteria>> {
        let statuses = self.statuses.as_ref().map(|statuses| {
            statuses
                .iter()
                .map(|status| status.as_str().to_string())
                .collect::<Vec<_>>()
        });
        CriteriaBuilder::new()
            .search_any(&["customer_name", "customer_phone"], self.search.as_deref())
            .eq_opt("merchant_id", self.merchant_id)
            .eq_opt("representative_id", self.representative_id)
            .eq_opt("branch_id", self.branch_id)
            .eq_opt("city_id", self.city_id)
            .in_opt("status", statuses)
            .eq_opt("is_deleted", self.is_deleted)
            .range_opt("total_cost", self.min_cost, self.max_cost)
            .range_opt("created_at", self.from_date, self.to_date)
            .build()
    }

    fn includes(&self) -> Vec<Include> {
        vec![
            Include::reference::<Merchant>("merchant", "merchant_id"),
            Include::reference::<City>("city", "city_id"),
            Include::reference::<Branch>("branch", "branch_id"),
        ]
    }
}
