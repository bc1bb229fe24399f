//! # shipping-core
//!
//! Core crate for the shipping back-office data-access layer. Contains the
//! unified error system, configuration schemas, typed identifiers,
//! filter/pagination/sorting types, the entity and storage-engine traits,
//! and the query specifications every repository call is built from.
//!
//! Nothing in this crate touches storage; specifications are plain values
//! evaluated later by a repository.
//!
//! This crate has **no** internal dependencies on other workspace crates.

pub mod config;
pub mod error;
pub mod result;
pub mod specification;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
pub use specification::{CountSpecification, Include, QueryParams, Specification};
pub use traits::Entity;
