//! Conversion between human-readable amounts and raw integer units.
//!
//! Conversion is done on the decimal string itself so that it stays exact for
//! every precision and magnitude a token can have; `rust_decimal` is only used
//! for fractional multipliers such as a balance percentage.

use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors produced when converting amounts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    /// The amount is not a plain non-negative decimal number.
    #[error("Invalid amount {0:?}: expected a non-negative decimal number")]
    Malformed(String),
    /// The raw value does not fit in 256 bits.
    #[error("Amount {0:?} overflows 256 bits")]
    Overflow(String),
    /// A percentage outside `(0, 1]`.
    #[error("Invalid percent {0}: expected a value in (0, 1]")]
    Percent(Decimal),
}

/// A raw token amount together with the precision used to produce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount {
    /// Amount in the token's smallest unit.
    pub raw: U256,
    /// Number of decimal places.
    pub decimals: u8,
}

impl TokenAmount {
    /// Parses a human-readable amount into raw units.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError`] if the amount is malformed or too large.
    pub fn from_human(amount: &str, decimals: u8) -> Result<Self, AmountError> {
        Ok(Self {
            raw: parse_units(amount, decimals)?,
            decimals,
        })
    }

    /// Formats the raw amount back into its human-readable form.
    #[must_use]
    pub fn to_human(&self) -> String {
        format_units(self.raw, self.decimals)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_human())
    }
}

/// Converts a human-readable decimal string into raw units.
///
/// The result is `round(amount × 10^decimals)` with halves rounded up. Digits
/// beyond the precision only participate in rounding; integer-valued inputs
/// are always exact.
///
/// # Errors
///
/// Returns [`AmountError::Malformed`] for signs, exponents, empty input or
/// non-digit characters, and [`AmountError::Overflow`] if the result does not
/// fit in a `U256`.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256, AmountError> {
    let trimmed = amount.trim();
    let malformed = || AmountError::Malformed(amount.to_owned());

    let (int_part, frac_part) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(malformed());
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit()) || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(malformed());
    }

    let precision = usize::from(decimals);
    let (kept, dropped) = frac_part.split_at(frac_part.len().min(precision));

    let mut digits = String::with_capacity(int_part.len() + precision);
    digits.push_str(int_part);
    digits.push_str(kept);
    digits.extend(std::iter::repeat_n('0', precision - kept.len()));
    if digits.is_empty() {
        digits.push('0');
    }

    let mut raw: U256 = digits
        .parse()
        .map_err(|_| AmountError::Overflow(amount.to_owned()))?;
    if dropped.as_bytes().first().is_some_and(|d| *d >= b'5') {
        raw = raw
            .checked_add(U256::from(1u8))
            .ok_or_else(|| AmountError::Overflow(amount.to_owned()))?;
    }
    Ok(raw)
}

/// Formats raw units as a human-readable decimal string.
///
/// Trailing fractional zeros are removed; whole amounts have no decimal point.
#[must_use]
pub fn format_units(raw: U256, decimals: u8) -> String {
    let digits = raw.to_string();
    let precision = usize::from(decimals);
    if precision == 0 {
        return digits;
    }
    let padded = if digits.len() <= precision {
        format!("{}{digits}", "0".repeat(precision - digits.len() + 1))
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - precision);
    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.is_empty() {
        int_part.to_owned()
    } else {
        format!("{int_part}.{frac_part}")
    }
}

/// Checks that `percent` is a balance share in `(0, 1]`.
///
/// # Errors
///
/// Returns [`AmountError::Percent`] otherwise.
pub fn check_percent(percent: Decimal) -> Result<(), AmountError> {
    if percent <= Decimal::ZERO || percent > Decimal::ONE {
        return Err(AmountError::Percent(percent));
    }
    Ok(())
}

/// Returns `floor(raw × percent)` for a percent in `(0, 1]`.
///
/// # Errors
///
/// Returns [`AmountError::Percent`] if `percent` is outside `(0, 1]`.
pub fn apply_percent(raw: U256, percent: Decimal) -> Result<U256, AmountError> {
    check_percent(percent)?;
    let mantissa = percent.mantissa().unsigned_abs();
    let scale = 10u128.pow(percent.scale());
    let scaled = raw
        .checked_mul(U256::from(mantissa))
        .ok_or_else(|| AmountError::Overflow(raw.to_string()))?;
    Ok(scaled / U256::from(scale))
}

/// Converts raw units into a [`Decimal`] with the given precision.
///
/// # Errors
///
/// Returns [`AmountError::Overflow`] if the value exceeds the range of
/// [`Decimal`].
pub fn to_decimal(raw: &str, decimals: u8) -> Result<Decimal, AmountError> {
    let value: U256 = raw
        .trim()
        .parse()
        .map_err(|_| AmountError::Malformed(raw.to_owned()))?;
    format_units(value, decimals)
        .parse::<Decimal>()
        .map_err(|_| AmountError::Overflow(raw.to_owned()))
}
