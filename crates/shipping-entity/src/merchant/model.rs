//! Merchant entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shipping_core::traits::{Reference, TableDef};
use shipping_core::types::{BranchId, CityId, FilterField, MerchantId, UserId};
use shipping_core::{Entity, Specification};

use crate::branch::Branch;
use crate::city::City;
use crate::user::UserAccount;

static TABLE: TableDef = TableDef::new("merchants")
    .required(&["user_id", "store_name", "city_id", "branch_id"])
    .unique(&[&["user_id"]])
    .references(&[
        Reference::to("user_id", "users"),
        Reference::to("city_id", "cities"),
        Reference::to("branch_id", "branches"),
    ])
    .navigations(&["user", "city", "branch"]);

/// A store that ships orders through the company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Merchant {
    /// Unique merchant identifier.
    pub id: MerchantId,
    /// The identity user this merchant signs in as. One merchant per user.
    pub user_id: UserId,
    /// Store display name.
    pub store_name: String,
    /// City the store picks up from.
    pub city_id: CityId,
    /// Branch that services the store.
    pub branch_id: BranchId,
    /// Negotiated pickup price overriding the city tariff.
    #[serde(default)]
    pub special_pickup_price: Option<f64>,
    /// Share of the shipping cost the merchant pays on returned orders, in percent.
    #[serde(default)]
    pub return_share_percent: f64,
    /// Soft-delete flag.
    #[serde(default)]
    pub is_deleted: bool,
    /// When the merchant was created.
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<City>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<Branch>,
}

impl Merchant {
    /// Create a new, active merchant.
    pub fn new(
        user_id: UserId,
        store_name: impl Into<String>,
        city_id: CityId,
        branch_id: BranchId,
    ) -> Self {
        Self {
            id: MerchantId::new(),
            user_id,
            store_name: store_name.into(),
            city_id,
            branch_id,
            special_pickup_price: None,
            return_share_percent: 0.0,
            is_deleted: false,
            created_at: Utc::now(),
            user: None,
            city: None,
            branch: None,
        }
    }

    /// The merchant signing in as `user_id`, with its user row attached.
    pub fn for_user(user_id: UserId) -> Specification<Merchant> {
        Specification::matching(FilterField::eq("user_id", user_id))
            .include(shipping_core::Include::reference::<UserAccount>("user", "user_id"))
    }
}

impl Entity for Merchant {
    type Key = MerchantId;

    fn table() -> &'static TableDef {
        &TABLE
    }

    fn key(&self) -> MerchantId {
        self.id
    }
}
