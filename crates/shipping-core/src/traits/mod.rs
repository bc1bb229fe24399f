//! Core traits defined in `shipping-core` and implemented by other crates.

pub mod entity;
pub mod storage;

pub use entity::{Entity, Reference, TableDef};
pub use storage::{StagedOp, StorageConnection, StorageEngine, StoredRow};
