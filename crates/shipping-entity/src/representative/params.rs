use serde::{Deserialize, Serialize};

use shipping_core::specification::{CriteriaBuilder, Include, PagingParams, QueryParams};
use shipping_core::types::{BranchId, Criteria};
use shipping_core::AppResult;

use super::model::{DiscountKind, Representative, RepresentativeGovernorate};
use crate::branch::Branch;
use crate::user::UserAccount;

/// Filters accepted by the representative listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepresentativeParams {
    #[serde(flatten)]
    pub paging: PagingParams,
    pub branch_id: Option<BranchId>,
    pub discount_kind: Option<DiscountKind>,
    pub is_deleted: Option<bool>,
    pub min_company_share: Option<f64>,
    pub max_company_share: Option<f64>,
}

impl QueryParams for RepresentativeParams {
    type Entity = Representative;

    const SORT_KEYS: &'static [(&'static str, &'static str)] = &[
        ("companyShare", "company_share"),
        ("createdAt", "created_at"),
        ("userName", "user.user_name"),
        ("branch", "branch.name"),
    ];

    fn paging(&self) -> &PagingParams {
        &self.paging
    }

    fn criteria(&self) -> AppResult<Option<Criteria>> {
        let discount_kind = self.discount_kind.map(|kind| match kind {
            DiscountKind::Fixed => "fixed",
            DiscountKind::Percentage => "percentage",
        });
        CriteriaBuilder::new()
            .eq_opt("branch_id", self.branch_id)
            .eq_opt("discount_kind", discount_kind)
            .eq_opt("is_deleted", self.is_deleted)
            .range_opt("company_share", self.min_company_share, self.max_company_share)
            .build()
    }

    fn includes(&self) -> Vec<Include> {
        vec![
            Include::reference::<UserAccount>("user", "user_id"),
            Include::reference::<Branch>("branch", "branch_id"),
            Include::collection::<RepresentativeGovernorate>("governorates", "representative_id"),
        ]
    }
}
