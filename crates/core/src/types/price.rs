//! Listing price using decimal arithmetic.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Price`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    /// Not a decimal number.
    #[error("price must be a number")]
    NotANumber,
    /// Zero or negative.
    #[error("price must be greater than zero")]
    NotPositive,
    /// Above what a `NUMERIC(12, 2)` column holds.
    #[error("price must be at most 9999999999.99")]
    TooLarge,
}

/// Asking price of a listing, in the marketplace currency (USD).
///
/// Serialized as a decimal string to avoid float rounding on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Largest storable amount, 9,999,999,999.99.
    pub const MAX: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

    /// Create a price rounded to cents, rejecting zero, negative and
    /// oversized amounts.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::NotPositive` if `amount <= 0` and
    /// `PriceError::TooLarge` if the rounded amount exceeds [`Price::MAX`].
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount <= Decimal::ZERO {
            return Err(PriceError::NotPositive);
        }
        let amount = amount.round_dp(2);
        if amount > Self::MAX {
            return Err(PriceError::TooLarge);
        }
        Ok(Self(amount))
    }

    /// The underlying amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = Decimal::from_str(s.trim()).map_err(|_| PriceError::NotANumber)?;
        Self::new(amount)
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rounds_to_cents() {
        let price: Price = "18999.999".parse().unwrap();
        assert_eq!(price.amount(), Decimal::new(1_900_000, 2));
        assert_eq!(price.to_string(), "$19000.00");
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert_eq!("free".parse::<Price>(), Err(PriceError::NotANumber));
        assert_eq!("0".parse::<Price>(), Err(PriceError::NotPositive));
        assert_eq!("-5".parse::<Price>(), Err(PriceError::NotPositive));
    }

    #[test]
    fn test_price_fits_numeric_column() {
        assert_eq!(Price::MAX, Decimal::new(999_999_999_999, 2));
        let top: Price = "9999999999.99".parse().unwrap();
        assert_eq!(top.amount(), Price::MAX);
        assert_eq!("10000000000".parse::<Price>(), Err(PriceError::TooLarge));
        // Rounds up past the maximum.
        assert_eq!("9999999999.995".parse::<Price>(), Err(PriceError::TooLarge));
    }
}
