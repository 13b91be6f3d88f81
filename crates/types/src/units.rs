//! Conversion between display amounts and natural token units

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

/// Scale factors above this overflow `u64`
pub const MAX_DECIMALS: u8 = 19;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("amount is not a number: {0}")]
    NotNumeric(String),

    #[error("amount must be greater than zero: {0}")]
    NotPositive(String),

    #[error("decimal precision {0} is not supported")]
    UnsupportedPrecision(u8),

    #[error("amount does not fit in natural units: {0}")]
    Overflow(String),
}

/// Parse a user-entered amount, requiring a positive number
pub fn parse_display_amount(input: &str) -> Result<Decimal, AmountError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }

    let amount =
        Decimal::from_str(trimmed).map_err(|_| AmountError::NotNumeric(trimmed.to_string()))?;
    if amount <= Decimal::ZERO {
        return Err(AmountError::NotPositive(trimmed.to_string()));
    }

    Ok(amount)
}

/// Convert a display amount to natural units of a mint with `decimals` precision.
///
/// Fraction digits beyond the mint's precision are truncated, so the result
/// may be zero for very small inputs.
pub fn parse_natural_amount(input: &str, decimals: u8) -> Result<u64, AmountError> {
    let amount = parse_display_amount(input)?;
    let factor = 10u64
        .checked_pow(u32::from(decimals))
        .ok_or(AmountError::UnsupportedPrecision(decimals))?;

    amount
        .checked_mul(Decimal::from(factor))
        .map(|scaled| scaled.trunc())
        .and_then(|natural| natural.to_u64())
        .ok_or_else(|| AmountError::Overflow(input.trim().to_string()))
}
