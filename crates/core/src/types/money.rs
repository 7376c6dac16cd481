//! Exact monetary amounts using decimal arithmetic.
//!
//! Amounts are always held with exactly two fractional digits. Arithmetic is
//! checked; nothing here goes through floating point.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Money`] value.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The amount is negative.
    #[error("amount cannot be negative")]
    Negative,
    /// The amount is zero where a positive amount is required.
    #[error("amount must be greater than zero")]
    NotPositive,
    /// The amount has more than two fractional digits.
    #[error("amount must have at most {max} decimal places")]
    TooPrecise {
        /// Maximum number of fractional digits.
        max: u32,
    },
    /// The amount is larger than [`Money::MAX`].
    #[error("amount exceeds {max}", max = Money::MAX)]
    Overflow,
}

/// A non-negative amount of money with two fractional digits.
///
/// ```
/// use marquee_core::Money;
/// use rust_decimal::Decimal;
///
/// let price = Money::positive(Decimal::new(1250, 2)).unwrap();
/// let total = price.times(3).unwrap();
/// assert_eq!(total.to_string(), "37.50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Number of fractional digits every amount carries.
    pub const SCALE: u32 = 2;

    /// Zero.
    pub const ZERO: Self = Self(Decimal::from_parts(0, 0, 0, false, Self::SCALE));

    /// Largest amount a price or purchase total may hold: 99,999,999.99,
    /// the range of a `NUMERIC(10,2)` column.
    pub const MAX: Self = Self(Decimal::from_parts(1_410_065_407, 2, 0, false, Self::SCALE));

    /// Construct a non-negative amount.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is negative, has more than two
    /// significant fractional digits, or exceeds [`Money::MAX`].
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        let money = Self::unbounded(amount)?;
        if money > Self::MAX {
            return Err(MoneyError::Overflow);
        }
        Ok(money)
    }

    /// Construct a non-negative amount with no upper bound.
    ///
    /// Only for aggregates such as total revenue, which are never stored in
    /// a single price or total column.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is negative or has more than two
    /// significant fractional digits.
    pub fn unbounded(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative);
        }
        if amount.normalize().scale() > Self::SCALE {
            return Err(MoneyError::TooPrecise { max: Self::SCALE });
        }
        let mut amount = amount;
        amount.rescale(Self::SCALE);
        Ok(Self(amount))
    }

    /// Construct a strictly positive amount, as required for prices.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is not greater than zero or has more
    /// than two significant fractional digits.
    pub fn positive(amount: Decimal) -> Result<Self, MoneyError> {
        let money = Self::new(amount)?;
        if money.0.is_zero() {
            return Err(MoneyError::NotPositive);
        }
        Ok(money)
    }

    /// Multiply by a ticket quantity.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] if the product exceeds [`Money::MAX`].
    pub fn times(self, quantity: u32) -> Result<Self, MoneyError> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map(Self)
            .filter(|total| *total <= Self::MAX)
            .ok_or(MoneyError::Overflow)
    }

    /// The underlying decimal value.
    #[must_use]
    pub const fn amount(self) -> Decimal {
        self.0
    }

    /// Whether the amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0.is_zero()
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl std::iter::Sum for Money {
    /// Saturates at the decimal maximum instead of panicking.
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, m| {
            Self(acc.0.saturating_add(m.0))
        })
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_times_is_exact() {
        let price = Money::positive(dec("12.50")).unwrap();
        assert_eq!(price.times(3).unwrap().amount(), dec("37.50"));

        // 0.1 + 0.2 style drift must not appear
        let price = Money::positive(dec("0.10")).unwrap();
        assert_eq!(price.times(3).unwrap().to_string(), "0.30");
    }

    #[test]
    fn test_rescales_to_two_places() {
        let money = Money::positive(dec("9")).unwrap();
        assert_eq!(money.to_string(), "9.00");
        let money = Money::positive(dec("9.500")).unwrap();
        assert_eq!(money.to_string(), "9.50");
    }

    #[test]
    fn test_rejects_bad_amounts() {
        assert_eq!(Money::positive(dec("0")), Err(MoneyError::NotPositive));
        assert_eq!(Money::new(dec("-1.00")), Err(MoneyError::Negative));
        assert!(matches!(
            Money::new(dec("1.005")),
            Err(MoneyError::TooPrecise { max: 2 })
        ));
    }

    #[test]
    fn test_zero_is_allowed_for_new() {
        assert!(Money::new(Decimal::ZERO).unwrap().is_zero());
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn test_max_is_numeric_10_2_bound() {
        assert_eq!(Money::MAX.to_string(), "99999999.99");
        assert_eq!(Money::new(dec("99999999.99")), Ok(Money::MAX));
        assert_eq!(Money::new(dec("100000000.00")), Err(MoneyError::Overflow));
        assert_eq!(Money::positive(dec("100000000")), Err(MoneyError::Overflow));
    }

    #[test]
    fn test_times_overflow() {
        let price = Money::positive(dec("12.50")).unwrap();
        assert_eq!(price.times(10_000_000), Err(MoneyError::Overflow));
        assert_eq!(price.times(7_999_999).unwrap().to_string(), "99999987.50");
        assert_eq!(Money::MAX.times(1), Ok(Money::MAX));
        assert_eq!(Money::MAX.times(u32::MAX), Err(MoneyError::Overflow));
    }

    #[test]
    fn test_unbounded_allows_large_aggregates() {
        let revenue = Money::unbounded(dec("250000000.00")).unwrap();
        assert!(revenue > Money::MAX);
        assert_eq!(Money::unbounded(dec("-1")), Err(MoneyError::Negative));
    }

    #[test]
    fn test_sum() {
        let total: Money = [dec("1.25"), dec("2.50")]
            .into_iter()
            .map(|d| Money::new(d).unwrap())
            .sum();
        assert_eq!(total.to_string(), "3.75");
    }

    #[test]
    fn test_serde_as_string() {
        let money = Money::positive(dec("12.50")).unwrap();
        assert_eq!(serde_json::to_string(&money).unwrap(), "\"12.50\"");
        let parsed: Money = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(parsed, money);
        assert!(serde_json::from_str::<Money>("\"-3\"").is_err());
    }
}
