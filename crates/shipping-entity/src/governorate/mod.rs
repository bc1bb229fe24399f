//! Governorate domain entities.

pub mod model;
pub mod params;

pub use model::Governorate;
pub use params::GovernorateParams;
