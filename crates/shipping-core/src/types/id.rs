//! Newtype wrappers around [`uuid::Uuid`] for all shipping entity identifiers.
//!
//! Using distinct types prevents accidentally passing a `CityId` where a
//! `BranchId` is expected. Every ID converts into a [`FilterValue`] so it
//! can be used directly in filter criteria.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::filter::FilterValue;

/// Macro to define a newtype ID wrapper around `Uuid`.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new time-ordered identifier.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Create an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Return the inner UUID value.
            pub fn into_uuid(self) -> Uuid {
                self.0
            }

            /// Return a reference to the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }

        impl From<$name> for FilterValue {
            fn from(id: $name) -> FilterValue {
                FilterValue::Uuid(id.0)
            }
        }
    };
}

define_id!(
    /// Unique identifier for an identity user account.
    UserId
);

define_id!(
    /// Unique identifier for a governorate.
    GovernorateId
);

define_id!(
    /// Unique identifier for a city.
    CityId
);

define_id!(
    /// Unique identifier for a branch.
    BranchId
);

define_id!(
    /// Unique identifier for a merchant.
    MerchantId
);

define_id!(
    /// Unique identifier for a shipping representative.
    RepresentativeId
);

define_id!(
    /// Unique identifier for an order.
    OrderId
);
