//! Storage engine selection.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which storage engine backs the units of work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageEngineKind {
    /// Process-local tables. Data does not survive a restart.
    #[default]
    Memory,
    /// PostgreSQL through the sqlx pool described by `DatabaseConfig`.
    Postgres,
}

impl fmt::Display for StorageEngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Postgres => write!(f, "postgres"),
        }
    }
}

/// Storage configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Engine used by `connect_engine`.
    #[serde(default)]
    pub engine: StorageEngineKind,
}
