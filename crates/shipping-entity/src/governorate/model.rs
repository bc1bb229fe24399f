//! Governorate entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shipping_core::Entity;
use shipping_core::traits::TableDef;
use shipping_core::types::GovernorateId;

use crate::city::City;

static TABLE: TableDef = TableDef::new("governorates")
    .required(&["name"])
    .unique(&[&["name"]])
    .navigations(&["cities"]);

/// A top-level administrative region that cities belong to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Governorate {
    /// Unique governorate identifier.
    pub id: GovernorateId,
    /// Unique display name.
    pub name: String,
    /// Soft-delete flag.
    #[serde(default)]
    pub is_deleted: bool,
    /// When the governorate was created.
    pub created_at: DateTime<Utc>,
    /// Cities in this governorate (populated by an include).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cities: Vec<City>,
}

impl Governorate {
    /// Create a new, active governorate.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: GovernorateId::new(),
            name: name.into(),
            is_deleted: false,
            created_at: Utc::now(),
            cities: Vec::new(),
        }
    }
}

impl Entity for Governorate {
    type Key = GovernorateId;

    fn table() -> &'static TableDef {
        &TABLE
    }

    fn key(&self) -> GovernorateId {
        self.id
    }
}
