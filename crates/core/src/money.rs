//! Fixed-point currency amounts.
//!
//! Prices are `NUMERIC(10,2)` in the store and integer cents in memory. The
//! type is unsigned, so a negative price cannot be constructed.

use core::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{DomainError, DomainResult};
use crate::quantity::Quantity;
use crate::value_object::ValueObject;

/// Amount in the smallest currency unit (cents).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money {
    cents: u64,
}

impl Money {
    pub const ZERO: Money = Money { cents: 0 };

    /// Largest amount a `NUMERIC(10,2)` column holds: 99,999,999.99.
    pub const MAX_STORED: Money = Money {
        cents: 9_999_999_999,
    };

    pub const fn from_cents(cents: u64) -> Self {
        Self { cents }
    }

    pub const fn cents(self) -> u64 {
        self.cents
    }

    /// Cents as the signed integer the SQL layer binds.
    pub fn cents_i64(self) -> DomainResult<i64> {
        i64::try_from(self.cents).map_err(|_| DomainError::invalid("amount is too large"))
    }

    pub fn from_cents_i64(cents: i64) -> DomainResult<Self> {
        u64::try_from(cents)
            .map(Self::from_cents)
            .map_err(|_| DomainError::invalid(format!("amount cannot be negative: {cents} cents")))
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.cents.checked_add(other.cents).map(Self::from_cents)
    }

    /// Fails with `InvalidArgument` when the amount does not fit a price column.
    pub fn ensure_storable(self, what: &str) -> DomainResult<Self> {
        if self > Self::MAX_STORED {
            return Err(DomainError::invalid(format!(
                "{what} {self} exceeds the maximum of {}",
                Self::MAX_STORED
            )));
        }
        Ok(self)
    }

    /// Line total: unit price × quantity.
    pub fn checked_mul(self, quantity: Quantity) -> Option<Money> {
        let units = u64::try_from(quantity.get()).ok()?;
        self.cents.checked_mul(units).map(Self::from_cents)
    }

    /// Convert a JSON float such as `9.99`, rounding to the nearest cent.
    pub fn try_from_f64(value: f64) -> DomainResult<Self> {
        if !value.is_finite() || value < 0.0 {
            return Err(DomainError::invalid(format!(
                "amount must be a non-negative number, got {value}"
            )));
        }
        let cents = (value * 100.0).round();
        if cents > u64::MAX as f64 {
            return Err(DomainError::invalid("amount is too large"));
        }
        Ok(Self::from_cents(cents as u64))
    }
}

impl ValueObject for Money {}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

impl FromStr for Money {
    type Err = DomainError;

    /// Parses `"12"`, `"12.5"` or `"12.50"`; more than two decimals is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let malformed = || DomainError::invalid(format!("malformed amount: {s:?}"));

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        if frac.len() > 2 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }

        let whole: u64 = whole.parse().map_err(|_| malformed())?;
        let frac_cents: u64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u64>().map_err(|_| malformed())? * 10,
            _ => frac.parse().map_err(|_| malformed())?,
        };

        whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac_cents))
            .map(Self::from_cents)
            .ok_or_else(|| DomainError::invalid("amount is too large"))
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("a non-negative decimal amount as a number or string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        v.checked_mul(100)
            .map(Money::from_cents)
            .ok_or_else(|| E::custom("amount is too large"))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        let v = u64::try_from(v).map_err(|_| E::custom("amount cannot be negative"))?;
        self.visit_u64(v)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        Money::try_from_f64(v).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_and_formats_two_decimals() {
        assert_eq!("9.99".parse::<Money>().unwrap().cents(), 999);
        assert_eq!("12".parse::<Money>().unwrap().cents(), 1200);
        assert_eq!("0.5".parse::<Money>().unwrap().cents(), 50);
        assert_eq!(Money::from_cents(92000_00).to_string(), "92000.00");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
    }

    #[test]
    fn rejects_malformed_amounts() {
        for raw in ["", "-1", "1.234", "abc", ".5", "1.x"] {
            assert!(raw.parse::<Money>().is_err(), "{raw:?} should be rejected");
        }
        assert!(Money::try_from_f64(-0.01).is_err());
        assert!(Money::try_from_f64(f64::NAN).is_err());
    }

    #[test]
    fn storable_amounts_stop_at_numeric_10_2() {
        assert!(Money::MAX_STORED.ensure_storable("price").is_ok());
        assert_eq!(Money::MAX_STORED.to_string(), "99999999.99");

        let err = "100000000.00"
            .parse::<Money>()
            .unwrap()
            .ensure_storable("price")
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));
        assert!(err.to_string().contains("price 100000000.00"));
    }

    #[test]
    fn line_total_multiplies_by_quantity() {
        let price: Money = "9.99".parse().unwrap();
        let total = price.checked_mul(Quantity::new(3).unwrap()).unwrap();
        assert_eq!(total.to_string(), "29.97");
    }

    #[test]
    fn json_accepts_numbers_and_strings() {
        let from_float: Money = serde_json::from_str("9.99").unwrap();
        let from_int: Money = serde_json::from_str("10").unwrap();
        let from_str: Money = serde_json::from_str("\"9.99\"").unwrap();
        assert_eq!(from_float.cents(), 999);
        assert_eq!(from_int.cents(), 1000);
        assert_eq!(from_str, from_float);
        assert!(serde_json::from_str::<Money>("-5").is_err());
        assert_eq!(serde_json::to_string(&from_str).unwrap(), "\"9.99\"");
    }

    proptest! {
        /// Display output always parses back to the same amount.
        #[test]
        fn display_is_parseable(cents in 0u64..10_000_000_000u64) {
            let money = Money::from_cents(cents);
            let parsed: Money = money.to_string().parse().unwrap();
            prop_assert_eq!(parsed, money);
        }
    }
}
