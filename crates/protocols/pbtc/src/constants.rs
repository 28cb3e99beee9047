//! pBTC constants

use rust_decimal::Decimal;

/// Smallest redeemable amount (0.00005 BTC)
pub const MINIMUM_BTC_REDEEMABLE: Decimal = Decimal::from_parts(5, 0, 0, false, 5);
