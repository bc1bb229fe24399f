//! Branch entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shipping_core::Entity;
use shipping_core::traits::{Reference, TableDef};
use shipping_core::types::{BranchId, CityId};

use crate::city::City;

static TABLE: TableDef = TableDef::new("branches")
    .required(&["name", "city_id"])
    .unique(&[&["name"]])
    .references(&[Reference::to("city_id", "cities")])
    .navigations(&["city"]);

/// A company branch that representatives and orders are assigned to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    /// Unique branch identifier.
    pub id: BranchId,
    /// Unique display name.
    pub name: String,
    /// City the branch is located in.
    pub city_id: CityId,
    /// Soft-delete flag.
    #[serde(default)]
    pub is_deleted: bool,
    /// When the branch was created.
    pub created_at: DateTime<Utc>,
    /// The branch city (populated by an include).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<City>,
}

impl Branch {
    /// Create a new, active branch.
    pub fn new(name: impl Into<String>, city_id: CityId) -> Self {
        Self {
            id: BranchId::new(),
            name: name.into(),
            city_id,
            is_deleted: false,
            created_at: Utc::now(),
            city: None,
        }
    }
}

impl Entity for Branch {
    type Key = BranchId;

    fn table() -> &'static TableDef {
        &TABLE
    }

    fn key(&self) -> BranchId {
        self.id
    }
}
