//! Merchant domain entities.

pub mod model;
pub mod params;

pub use model::Merchant;
pub use params::MerchantParams;
