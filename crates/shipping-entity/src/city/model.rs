//! City entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shipping_core::Entity;
use shipping_core::traits::{Reference, TableDef};
use shipping_core::types::{CityId, GovernorateId};

use crate::governorate::Governorate;

static TABLE: TableDef = TableDef::new("cities")
    .required(&["name", "governorate_id"])
    .unique(&[&["governorate_id", "name"]])
    .references(&[Reference::to("governorate_id", "governorates")])
    .navigations(&["governorate"]);

/// A delivery city with its shipping tariff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct City {
    /// Unique city identifier.
    pub id: CityId,
    /// Display name, unique within its governorate.
    pub name: String,
    /// Owning governorate.
    pub governorate_id: GovernorateId,
    /// Standard shipping price for deliveries to this city.
    pub shipping_price: f64,
    /// Price charged when a representative picks up from the merchant.
    pub pickup_price: f64,
    /// Soft-delete flag.
    #[serde(default)]
    pub is_deleted: bool,
    /// When the city was created.
    pub created_at: DateTime<Utc>,
    /// The owning governorate (populated by an include).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub governorate: Option<Box<Governorate>>,
}

impl City {
    /// Create a new, active city.
    pub fn new(name: impl Into<String>, governorate_id: GovernorateId, shipping_price: f64) -> Self {
        Self {
            id: CityId::new(),
            name: name.into(),
            governorate_id,
            shipping_price,
            pickup_price: 0.0,
            is_deleted: false,
            created_at: Utc::now(),
            governorate: None,
        }
    }
}

impl Entity for City {
    type Key = CityId;

    fn table() -> &'static TableDef {
        &TABLE
    }

    fn key(&self) -> CityId {
        self.id
    }
}
