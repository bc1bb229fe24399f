use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shipping_core::Entity;
use shipping_core::traits::TableDef;
use shipping_core::types::UserId;

static TABLE: TableDef = TableDef::new("users")
    .required(&["user_name", "email", "role"])
    .unique(&[&["user_name"], &["email"]]);

/// Role assigned to an identity user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Full back-office access.
    Admin,
    /// Branch staff.
    Employee,
    /// A merchant shipping through the company.
    Merchant,
    /// A delivery representative.
    Representative,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Admin => "admin",
            Self::Employee => "employee",
            Self::Merchant => "merchant",
            Self::Representative => "representative",
        };
        f.write_str(text)
    }
}

/// An identity user row that merchants and representatives hang off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub user_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    /// Create a user row with a fresh identifier.
    pub fn new(user_name: impl Into<String>, email: impl Into<String>, role: UserRole) -> Self {
        Self {
            id: UserId::new(),
            user_name: user_name.into(),
            email: email.into(),
            phone: None,
            role,
            created_at: Utc::now(),
        }
    }
}

impl Entity for UserAccount {
    type Key = UserId;

    fn table() -> &'static TableDef {
        &TABLE
    }

    fn key(&self) -> UserId {
        self.id
    }
}
