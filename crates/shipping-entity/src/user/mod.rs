//! Identity user rows.
//!
//! Only the columns other entities reference are modeled. Sign-in,
//! password and token handling live in the identity service.

pub mod model;

pub use model::{UserAccount, UserRole};
