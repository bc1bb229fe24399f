use serde::{Deserialize, Serialize};

use shipping_core::specification::{CriteriaBuilder, Include, PagingParams, QueryParams};
use shipping_core::types::{BranchId, CityId, Criteria};
use shipping_core::AppResult;

use super::model::Merchant;
use crate::branch::Branch;
use crate::city::City;
use crate::user::UserAccount;

/// Filters accepted by the merchant listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantParams {
    #[serde(flatten)]
    pub paging: PagingParams,
    /// Case-insensitive store name search.
    pub search: Option<String>,
    pub city_id: Option<CityId>,
    pub branch_id: Option<BranchId>,
    pub is_deleted: Option<bool>,
}

impl QueryParams for MerchantParams {
    type Entity = Merchant;

    const SORT_KEYS: &'static [(&'static str, &'static str)] = &[
        ("storeName", "store_name"),
        ("createdAt", "created_at"),
        ("city", "city.name"),
        ("branch", "branch.name"),
    ];

    fn paging(&self) -> &PagingParams {
        &self.paging
    }

    fn criteria(&self) -> AppResult<Option<Criteria>> {
        CriteriaBuilder::new()
            .contains_opt("store_name", self.search.as_deref())
            .eq_opt("city_id", self.city_id)
            .eq_opt("branch_id", self.branch_id)
            .eq_opt("is_deleted", self.is_deleted)
            .build()
    }

    fn includes(&self) -> Vec<Include> {
        vec![
            Include::reference::<UserAccount>("user", "user_id"),
            Include::reference::<City>("city", "city_id"),
            Include::reference::<Branch>("branch", "branch_id"),
        ]
    }
}
