//! pLTC constants

use rust_decimal::Decimal;

/// Smallest redeemable amount (0.00005 LTC)
pub const MINIMUM_LTC_REDEEMABLE: Decimal = Decimal::from_parts(5, 0, 0, false, 5);

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_minimum() {
        assert_eq!(MINIMUM_LTC_REDEEMABLE, Decimal::from_str("0.00005").unwrap());
    }
}
