//! # shipping-entity
//!
//! Entity models for the shipping back-office. Every struct here is one
//! stored document type and implements [`shipping_core::Entity`]. Each
//! listable entity also has a typed parameter object implementing
//! [`shipping_core::QueryParams`], from which both the paged
//! specification and its count specification are built.
//!
//! Navigation fields (`city`, `branch`, `cities`, ...) are only populated
//! when a specification includes them and are never written back.

pub mod branch;
pub mod city;
pub mod governorate;
pub mod merchant;
pub mod order;
pub mod representative;
pub mod user;

pub use branch::{Branch, BranchParams};
pub use city::{City, CityParams};
pub use governorate::{Governorate, GovernorateParams};
pub use merchant::{Merchant, MerchantParams};
pub use order::{Order, OrderParams, OrderStatus};
pub use representative::{DiscountKind, Representative, RepresentativeGovernorate, RepresentativeParams};
pub use user::{UserAccount, UserRole};
