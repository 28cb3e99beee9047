//! Amount conversion between on-chain integers and human-facing decimals
//!
//! On-chain amounts are integers scaled by `10^decimals` (8 for BTC/LTC
//! satoshis, 18 for ERC-20 pTokens). All arithmetic goes through
//! `rust_decimal`; no floating point is involved, so repeated conversions
//! never drift.

use rust_decimal::prelude::*;
use thiserror::Error;

/// Largest decimal count `rust_decimal` can scale by
pub const MAX_DECIMALS: u32 = 28;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("Amount must not be negative")]
    Negative,

    #[error("Precision overflow: provided {provided} decimals, max allowed {max}")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("Amount too large, would overflow")]
    Overflow,

    #[error("Unsupported decimal count {0}")]
    UnsupportedDecimals(u32),
}

fn scale_factor(decimals: u32) -> Result<Decimal, AmountError> {
    if decimals > MAX_DECIMALS {
        return Err(AmountError::UnsupportedDecimals(decimals));
    }
    Decimal::try_from_i128_with_scale(10i128.pow(decimals), 0)
        .map_err(|_| AmountError::UnsupportedDecimals(decimals))
}

/// Convert a human amount to its on-chain integer (`amount * 10^decimals`).
///
/// Fails rather than rounding when `amount` has more fractional digits than
/// the chain can represent.
pub fn to_on_chain(amount: Decimal, decimals: u32) -> Result<u128, AmountError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AmountError::Negative);
    }

    let provided = amount.normalize().scale();
    if provided > decimals {
        return Err(AmountError::PrecisionOverflow {
            provided,
            max: decimals,
        });
    }

    amount
        .checked_mul(scale_factor(decimals)?)
        .and_then(|scaled| scaled.trunc().to_u128())
        .ok_or(AmountError::Overflow)
}

/// Convert an on-chain integer back to a human amount (`amount / 10^decimals`)
pub fn to_off_chain(amount: u128, decimals: u32) -> Result<Decimal, AmountError> {
    if decimals > MAX_DECIMALS {
        return Err(AmountError::UnsupportedDecimals(decimals));
    }
    let value = i128::try_from(amount).map_err(|_| AmountError::Overflow)?;
    Decimal::try_from_i128_with_scale(value, decimals).map_err(|_| AmountError::Overflow)
}

/// Render an amount with exactly `decimals` fractional digits
pub fn format_amount(amount: Decimal, decimals: u32) -> String {
    let rounded = amount.round_dp(decimals);
    format!("{:.*}", decimals as usize, rounded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_to_on_chain() {
        assert_eq!(to_on_chain(dec("1"), 4).unwrap(), 10_000);
        assert_eq!(to_on_chain(dec("1.5"), 8).unwrap(), 150_000_000);
        assert_eq!(
            to_on_chain(dec("0.00005"), 18).unwrap(),
            50_000_000_000_000
        );
    }

    #[test]
    fn test_to_off_chain() {
        assert_eq!(to_off_chain(10_000, 4).unwrap(), dec("1"));
        assert_eq!(to_off_chain(150_000_000, 8).unwrap(), dec("1.5"));
    }

    #[test]
    fn test_round_trip_common_decimals() {
        let amounts = ["0", "1", "0.000001", "123.456", "21000000", "0.00005"];
        for decimals in [6u32, 8, 18] {
            for raw in amounts {
                let x = dec(raw);
                let on_chain = to_on_chain(x, decimals).unwrap();
                assert_eq!(to_off_chain(on_chain, decimals).unwrap(), x, "{raw} @ {decimals}");
            }
        }
    }

    #[test]
    fn test_precision_overflow() {
        assert_eq!(
            to_on_chain(dec("0.123456789"), 8),
            Err(AmountError::PrecisionOverflow {
                provided: 9,
                max: 8
            })
        );
        // trailing zeros are not extra precision
        assert_eq!(to_on_chain(dec("0.100000000"), 8).unwrap(), 10_000_000);
    }

    #[test]
    fn test_negative_rejected() {
        assert_eq!(to_on_chain(dec("-1"), 8), Err(AmountError::Negative));
    }

    #[test]
    fn test_unsupported_decimals() {
        assert_eq!(
            to_off_chain(1, 30),
            Err(AmountError::UnsupportedDecimals(30))
        );
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(dec("10"), 8), "10.00000000");
        assert_eq!(format_amount(dec("0.5"), 18), "0.500000000000000000");
        assert_eq!(format_amount(dec("1.23456789"), 2), "1.23");
    }
}
