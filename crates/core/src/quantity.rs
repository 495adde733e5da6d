//! Positive unit counts for cart and order lines.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// A strictly positive number of units that fits the store's `INT` columns.
///
/// Zero-quantity lines are never stored, so the type cannot represent them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i32")]
pub struct Quantity(i32);

impl Quantity {
    pub fn new(raw: i64) -> DomainResult<Self> {
        if raw <= 0 {
            return Err(DomainError::invalid(format!(
                "quantity must be a positive integer, got {raw}"
            )));
        }
        let raw = i32::try_from(raw)
            .map_err(|_| DomainError::invalid(format!("quantity {raw} is too large")))?;
        Ok(Self(raw))
    }

    pub const fn get(self) -> i32 {
        self.0
    }

    /// Sum two quantities (cart merge), failing instead of wrapping.
    pub fn checked_add(self, other: Quantity) -> DomainResult<Self> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or_else(|| DomainError::invalid("merged quantity is too large"))
    }
}

impl ValueObject for Quantity {}

impl TryFrom<i64> for Quantity {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for i32 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}
