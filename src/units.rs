//! Conversions between raw on-chain integer amounts and human-readable
//! decimal quantities.
//!
//! The two assets handled by this harness use different precisions (6 for
//! USDC, 18 for WETH), so every cross-asset comparison or valuation must
//! happen in normalized decimal space. Raw integers are never compared
//! directly.

use std::str::FromStr;

use ethers::types::U256;
use ethers::utils::format_units;
use rust_decimal::Decimal;
use rust_decimal::prelude::*;

use crate::error::RebalanceError;

/// Convert a raw on-chain amount into its human-readable value,
/// `raw / 10^decimals`. `decimals = 0` is the identity conversion.
pub fn normalize(raw: U256, decimals: u8) -> Result<Decimal, RebalanceError> {
    let formatted = format_units(raw, decimals as usize)
        .map_err(|_| RebalanceError::AmountOutOfRange(raw.to_string()))?;
    Decimal::from_str(&formatted).map_err(|_| RebalanceError::AmountOutOfRange(raw.to_string()))
}

/// Convert a human-readable value back to a raw on-chain amount,
/// `floor(amount * 10^decimals)`.
///
/// Rounding is floor: an emitted on-chain amount must never exceed the
/// balance that backs it. Negative amounts are rejected.
pub fn denormalize(amount: Decimal, decimals: u8) -> Result<U256, RebalanceError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(RebalanceError::InvalidAmount(amount));
    }
    let scale = Decimal::from(10u64)
        .checked_powu(decimals as u64)
        .ok_or_else(|| RebalanceError::AmountOutOfRange(amount.to_string()))?;
    let scaled = amount
        .checked_mul(scale)
        .ok_or_else(|| RebalanceError::AmountOutOfRange(amount.to_string()))?;
    // Decimal's range is a strict subset of u128, so the floor always fits
    let floored = scaled.floor();
    let raw = floored
        .to_u128()
        .ok_or_else(|| RebalanceError::AmountOutOfRange(amount.to_string()))?;
    Ok(U256::from(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;

    #[test]
    fn normalize_usdc_six_decimals() {
        let raw = U256::from(100_000_000u64); // 100 USDC
        assert_eq!(normalize(raw, 6).unwrap(), dec!(100));
    }

    #[test]
    fn normalize_weth_eighteen_decimals() {
        let raw = U256::from(1_500_000_000_000_000_000u128); // 1.5 WETH
        assert_eq!(normalize(raw, 18).unwrap(), dec!(1.5));
    }

    #[test]
    fn normalize_zero_decimals_is_identity() {
        assert_eq!(normalize(U256::from(42u64), 0).unwrap(), dec!(42));
    }

    #[test]
    fn normalize_zero_amount() {
        assert_eq!(normalize(U256::zero(), 18).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn denormalize_floors_fractional_dust() {
        // 1.9999999 USDC must floor to 1999999 raw units, never round up
        let raw = denormalize(dec!(1.9999999), 6).unwrap();
        assert_eq!(raw, U256::from(1_999_999u64));
    }

    #[test]
    fn denormalize_exact_amount() {
        let raw = denormalize(dec!(0.2), 18).unwrap();
        assert_eq!(raw, U256::from(200_000_000_000_000_000u128));
    }

    #[test]
    fn denormalize_zero_decimals_is_identity() {
        assert_eq!(denormalize(dec!(7), 0).unwrap(), U256::from(7u64));
    }

    #[test]
    fn denormalize_rejects_negative_amounts() {
        let err = denormalize(dec!(-1), 6).unwrap_err();
        assert_eq!(err, RebalanceError::InvalidAmount(dec!(-1)));
    }

    #[test]
    fn normalize_rejects_unrepresentable_amounts() {
        // U256::MAX has 78 digits, far past Decimal's 28-digit mantissa
        let err = normalize(U256::MAX, 0).unwrap_err();
        assert!(matches!(err, RebalanceError::AmountOutOfRange(_)));
    }

    #[test]
    fn denormalize_never_exceeds_backing_balance() {
        // A trade computed from a normalized balance, converted back down,
        // must stay within the original raw balance.
        let raw_balance = U256::from(123_456_789u64);
        let normalized = normalize(raw_balance, 6).unwrap();
        let round_tripped = denormalize(normalized, 6).unwrap();
        assert!(round_tripped <= raw_balance);
    }
}
