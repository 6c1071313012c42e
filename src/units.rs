//! Conversion between human-decimal amounts and integer base units
//!
//! Amounts are `rust_decimal::Decimal` so that `0.01` USDC.e is exactly
//! `10000` base units, never `9999` from a float round-trip. Both directions
//! truncate toward zero and never round up.

use crate::{Error, Result};
use alloy::primitives::U256;
use rust_decimal::Decimal;

/// Scale of comptroller mantissas (exchange rates, liquidity)
pub const MANTISSA_DECIMALS: u8 = 18;

/// Largest mantissa a `Decimal` can hold (2^96 - 1)
const MAX_DECIMAL_MANTISSA: u128 = (1u128 << 96) - 1;
const MAX_DECIMAL_SCALE: u32 = 28;

fn pow10(exp: u32) -> Result<U256> {
    U256::from(10u64)
        .checked_pow(U256::from(exp))
        .ok_or_else(|| Error::InvalidArgument(format!("10^{} overflows U256", exp)))
}

/// `floor(amount * 10^decimals)`
///
/// Negative amounts are rejected; digits beyond `decimals` are dropped.
pub fn to_base_units(amount: Decimal, decimals: u8) -> Result<U256> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(Error::InvalidArgument(format!(
            "amount must not be negative: {}",
            amount
        )));
    }

    let mantissa = U256::from(amount.mantissa().unsigned_abs());
    let scale = amount.scale();
    let decimals = u32::from(decimals);

    if decimals >= scale {
        mantissa
            .checked_mul(pow10(decimals - scale)?)
            .ok_or_else(|| Error::InvalidArgument(format!("{} overflows base units", amount)))
    } else {
        Ok(mantissa / pow10(scale - decimals)?)
    }
}

/// `value / 10^decimals`, truncated to what a `Decimal` can represent
pub fn from_base_units(value: U256, decimals: u8) -> Result<Decimal> {
    let mut scale = u32::from(decimals);
    let mut value = value;

    // Drop least significant digits until the value fits, or the scale allows
    // no further truncation.
    while (value > U256::from(MAX_DECIMAL_MANTISSA) || scale > MAX_DECIMAL_SCALE) && scale > 0 {
        value /= U256::from(10u64);
        scale -= 1;
    }

    if value > U256::from(MAX_DECIMAL_MANTISSA) {
        return Err(Error::InvalidArgument(format!(
            "{} base units exceed the decimal range",
            value
        )));
    }

    let mantissa = value.to::<u128>() as i128;
    Ok(Decimal::from_i128_with_scale(mantissa, scale).normalize())
}

/// Interpret a 1e18-scaled comptroller mantissa
pub fn from_mantissa(value: U256) -> Result<Decimal> {
    from_base_units(value, MANTISSA_DECIMALS)
}
