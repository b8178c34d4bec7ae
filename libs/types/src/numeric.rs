//! Integer base-unit amounts
//!
//! Every balance, bid, stake and reward is an unsigned integer count of the
//! token's smallest unit. Divisions truncate toward zero. `rust_decimal` is
//! only used at the edges, to convert human-readable quantities such as
//! `"0.35"` into base units and back.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::errors::NumericError;

/// Amount in a token's smallest unit.
pub type Amount = u128;

/// Conventional fractional digits for fungible tokens (1 unit = 10^18 base units).
pub const DEFAULT_DECIMALS: u32 = 18;

/// Largest scale `rust_decimal` can represent.
const MAX_DECIMAL_SCALE: u32 = 28;

/// Convert a decimal string into base units, e.g. `parse_units("0.35", 18)`.
///
/// Rejects negative values and inputs with more fractional digits than
/// `decimals`.
pub fn parse_units(input: &str, decimals: u32) -> Result<Amount, NumericError> {
    if decimals > MAX_DECIMAL_SCALE {
        return Err(NumericError::Overflow);
    }

    let value = Decimal::from_str_exact(input.trim()).map_err(|_| NumericError::InvalidFormat {
        input: input.to_string(),
    })?;

    if value.is_sign_negative() && !value.is_zero() {
        return Err(NumericError::Negative {
            input: input.to_string(),
        });
    }

    if value.normalize().scale() > decimals {
        return Err(NumericError::TooPrecise {
            input: input.to_string(),
            decimals,
        });
    }

    let multiplier = Decimal::from_i128_with_scale(10i128.pow(decimals), 0);
    value
        .checked_mul(multiplier)
        .and_then(|scaled| scaled.trunc().to_u128())
        .ok_or(NumericError::Overflow)
}

/// `parse_units` with [`DEFAULT_DECIMALS`].
pub fn parse_ether(input: &str) -> Result<Amount, NumericError> {
    parse_units(input, DEFAULT_DECIMALS)
}

/// Render base units as a normalized decimal, e.g. `350000000000000000 → 0.35`.
pub fn to_decimal(amount: Amount, decimals: u32) -> Result<Decimal, NumericError> {
    let mantissa = i128::try_from(amount).map_err(|_| NumericError::Overflow)?;
    Decimal::try_from_i128_with_scale(mantissa, decimals)
        .map(|d| d.normalize())
        .map_err(|_| NumericError::Overflow)
}

/// `a * b / denominator`, truncating, with overflow and zero checks.
pub fn mul_div(a: Amount, b: Amount, denominator: Amount) -> Result<Amount, NumericError> {
    if denominator == 0 {
        return Err(NumericError::DivisionByZero);
    }
    a.checked_mul(b)
        .map(|product| product / denominator)
        .ok_or(NumericError::Overflow)
}
