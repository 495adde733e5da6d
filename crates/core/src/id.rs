//! Strongly-typed identifiers used across the domain.
//!
//! Every persisted entity is keyed by a `SERIAL` integer in the store. The
//! newtypes below keep product ids from being passed where order ids are
//! expected.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

macro_rules! impl_int_id {
    ($(#[$meta:meta])* $t:ident, $name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $t(i32);

        impl $t {
            pub const fn new(raw: i32) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> i32 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i32> for $t {
            fn from(value: i32) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i32 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s
                    .trim()
                    .parse::<i32>()
                    .map_err(|e| DomainError::invalid(format!("malformed {}: {}", $name, e)))?;
                if raw <= 0 {
                    return Err(DomainError::invalid(format!(
                        "malformed {}: must be positive, got {}",
                        $name, raw
                    )));
                }
                Ok(Self(raw))
            }
        }
    };
}

impl_int_id!(
    /// Identifier of a catalog product.
    ProductId,
    "ProductId"
);
impl_int_id!(
    /// Identifier of a user account.
    UserId,
    "UserId"
);
impl_int_id!(CartId, "CartId");
impl_int_id!(CartItemId, "CartItemId");
impl_int_id!(
    /// Identifier of an order (groups one or more order lines).
    OrderId,
    "OrderId"
);
impl_int_id!(OrderLineId, "OrderLineId");
impl_int_id!(ReviewId, "ReviewId");
