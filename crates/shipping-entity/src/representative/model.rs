//! Representative entity models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shipping_core::Entity;
use shipping_core::traits::{Reference, TableDef};
use shipping_core::types::{BranchId, GovernorateId, RepresentativeId, UserId};

use crate::branch::Branch;
use crate::governorate::Governorate;
use crate::user::UserAccount;

static TABLE: TableDef = TableDef::new("representatives")
    .required(&["user_id", "branch_id", "discount_kind"])
    .unique(&[&["user_id"]])
    .references(&[
        Reference::to("user_id", "users"),
        Reference::to("branch_id", "branches"),
    ])
    .navigations(&["user", "branch", "governorates"]);

static COVERAGE_TABLE: TableDef = TableDef::new("representative_governorates")
    .required(&["representative_id", "governorate_id"])
    .unique(&[&["representative_id", "governorate_id"]])
    .references(&[
        Reference::to("representative_id", "representatives"),
        Reference::to("governorate_id", "governorates"),
    ])
    .navigations(&["governorate"]);

/// How the company's share of a delivery is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// A fixed amount per order.
    Fixed,
    /// A percentage of the order's shipping cost.
    Percentage,
}

/// A delivery representative working out of one branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Representative {
    /// Unique representative identifier.
    pub id: RepresentativeId,
    /// The identity user this representative signs in as.
    pub user_id: UserId,
    /// Home branch.
    pub branch_id: BranchId,
    /// How `company_share` is interpreted.
    pub discount_kind: DiscountKind,
    /// Company share per delivered order.
    pub company_share: f64,
    /// Soft-delete flag.
    #[serde(default)]
    pub is_deleted: bool,
    /// When the representative was created.
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<Branch>,
    /// Covered governorates (populated by an include).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub governorates: Vec<RepresentativeGovernorate>,
}

impl Representative {
    /// Create a new, active representative.
    pub fn new(
        user_id: UserId,
        branch_id: BranchId,
        discount_kind: DiscountKind,
        company_share: f64,
    ) -> Self {
        Self {
            id: RepresentativeId::new(),
            user_id,
            branch_id,
            discount_kind,
            company_share,
            is_deleted: false,
            created_at: Utc::now(),
            user: None,
            branch: None,
            governorates: Vec::new(),
        }
    }

    /// A join row assigning this representative to `governorate_id`.
    pub fn cover(&self, governorate_id: GovernorateId) -> RepresentativeGovernorate {
        RepresentativeGovernorate::new(self.id, governorate_id)
    }
}

impl Entity for Representative {
    type Key = RepresentativeId;

    fn table() -> &'static TableDef {
        &TABLE
    }

    fn key(&self) -> RepresentativeId {
        self.id
    }
}

/// Join row between a representative and a governorate they deliver to.
///
/// Keyed by the pair, so assigning the same governorate twice is a
/// constraint violation rather than a duplicate row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepresentativeGovernorate {
    pub representative_id: RepresentativeId,
    pub governorate_id: GovernorateId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub governorate: Option<Governorate>,
}

impl RepresentativeGovernorate {
    /// Assign `representative_id` to `governorate_id`.
    pub fn new(representative_id: RepresentativeId, governorate_id: GovernorateId) -> Self {
        Self {
            representative_id,
            governorate_id,
            governorate: None,
        }
    }
}

impl Entity for RepresentativeGovernorate {
    type Key = String;

    fn table() -> &'static TableDef {
        &COVERAGE_TABLE
    }

    fn key(&self) -> String {
        format!("{}:{}", self.representative_id, self.governorate_id)
    }
}
