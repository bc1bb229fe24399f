//! Order entity model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shipping_core::{AppError, Entity};
use shipping_core::traits::{Reference, TableDef};
use shipping_core::types::{BranchId, CityId, GovernorateId, MerchantId, OrderId, RepresentativeId};

use crate::branch::Branch;
use crate::city::City;
use crate::merchant::Merchant;
use crate::representative::Representative;

static TABLE: TableDef = TableDef::new("orders")
    .required(&[
        "merchant_id",
        "branch_id",
        "city_id",
        "governorate_id",
        "customer_name",
        "customer_phone",
        "status",
    ])
    .references(&[
        Reference::to("merchant_id", "merchants"),
        Reference::to("representative_id", "representatives"),
        Reference::to("branch_id", "branches"),
        Reference::to("city_id", "cities"),
        Reference::to("governorate_id", "governorates"),
    ])
    .navigations(&["merchant", "representative", "city", "branch"]);

/// Lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    Pending,
    AssignedToRepresentative,
    Delivered,
    PartiallyDelivered,
    Postponed,
    CannotBeReached,
    RejectedWithPayment,
    RejectedWithPartialPayment,
    RejectedWithoutPayment,
    Cancelled,
}

impl OrderStatus {
    /// The stored (snake_case) form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Pending => "pending",
            Self::AssignedToRepresentative => "assigned_to_representative",
            Self::Delivered => "delivered",
            Self::PartiallyDelivered => "partially_delivered",
            Self::Postponed => "postponed",
            Self::CannotBeReached => "cannot_be_reached",
            Self::RejectedWithPayment => "rejected_with_payment",
            Self::RejectedWithPartialPayment => "rejected_with_partial_payment",
            Self::RejectedWithoutPayment => "rejected_without_payment",
            Self::Cancelled => "cancelled",
        }
    }
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [OrderStatus; 11] = [
        Self::New,
        Self::Pending,
        Self::AssignedToRepresentative,
        Self::Delivered,
        Self::PartiallyDelivered,
        Self::Postponed,
        Self::CannotBeReached,
        Self::RejectedWithPayment,
        Self::RejectedWithPartialPayment,
        Self::RejectedWithoutPayment,
        Self::Cancelled,
    ];
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::validation(format!("Unknown order status '{s}'")))
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A shipment placed by a merchant for delivery to a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub merchant_id: MerchantId,
    /// Assigned once the order leaves the branch.
    #[serde(default)]
    pub representative_id: Option<RepresentativeId>,
    pub branch_id: BranchId,
    pub city_id: CityId,
    pub governorate_id: GovernorateId,
    pub customer_name: String,
    pub customer_phone: String,
    pub status: OrderStatus,
    /// Order value plus shipping.
    pub total_cost: f64,
    /// Total weight in kilograms.
    pub total_weight: f64,
    #[serde(default)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant: Option<Merchant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub representative: Option<Representative>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<City>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<Branch>,
}

impl Order {
    /// Create a new order for `merchant` delivering to `city`.
    ///
    /// The order is routed through the merchant's branch.
    pub fn new(
        merchant: &Merchant,
        city: &City,
        customer_name: impl Into<String>,
        customer_phone: impl Into<String>,
        total_cost: f64,
    ) -> Self {
        Self {
            id: OrderId::new(),
            merchant_id: merchant.id,
            representative_id: None,
            branch_id: merchant.branch_id,
            city_id: city.id,
            governorate_id: city.governorate_id,
            customer_name: customer_name.into(),
            customer_phone: customer_phone.into(),
            status: OrderStatus::New,
            total_cost,
            total_weight: 0.0,
            is_deleted: false,
            created_at: Utc::now(),
            merchant: None,
            representative: None,
            city: None,
            branch: None,
        }
    }

    /// Hand the order to a representative.
    pub fn assign(&mut self, representative_id: RepresentativeId) {
        self.representative_id = Some(representative_id);
        self.status = OrderStatus::AssignedToRepresentative;
    }
}

impl Entity for Order {
    type Key = OrderId;

    fn table() -> &'static TableDef {
        &TABLE
    }

    fn key(&self) -> OrderId {
        self.id
    }
}
