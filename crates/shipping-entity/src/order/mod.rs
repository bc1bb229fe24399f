//! Shipment orders.

pub mod model;
pub mod params;

pub use model::{Order, OrderStatus};
pub use params::OrderParams;
