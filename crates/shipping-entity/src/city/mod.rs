//! City domain entities.

pub mod model;
pub mod params;

pub use model::City;
pub use params::CityParams;
