//! Branch domain entities.

pub mod model;
pub mod params;

pub use model::Branch;
pub use params::BranchParams;
