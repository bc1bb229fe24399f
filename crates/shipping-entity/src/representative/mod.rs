//! Delivery representatives and the governorates they cover.

pub mod model;
pub mod params;

pub use model::{DiscountKind, Representative, RepresentativeGovernorate};
pub use params::RepresentativeParams;
