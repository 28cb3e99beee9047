//! Call data for the pToken ERC-20 `redeem` function

use alloy_primitives::U256;
use alloy_sol_types::{sol, SolCall};

sol! {
    /// Burns `amount` and asks the bridge to pay `underlyingAssetRecipient` on the native chain
    function redeem(uint256 amount, string underlyingAssetRecipient);
}

/// Calldata for `redeem(amount, destination)`
pub fn encode_redeem(amount: u128, destination: &str) -> Vec<u8> {
    redeemCall {
        amount: U256::from(amount),
        underlyingAssetRecipient: destination.to_string(),
    }
    .abi_encode()
}

/// `0x`-prefixed hex of calldata
pub fn encode_redeem_hex(amount: u128, destination: &str) -> String {
    format!("0x{}", hex::encode(encode_redeem(amount, destination)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector() {
        assert_eq!(redeemCall::SIGNATURE, "redeem(uint256,string)");
        assert_eq!(redeemCall::SELECTOR, [0x24, 0xb7, 0x6f, 0xd5]);
    }

    #[test]
    fn test_encode_redeem_layout() {
        let data = encode_redeem(50_000_000_000_000, "QZ1q");
        assert_eq!(data.len(), 4 + 32 * 4);
        assert_eq!(&data[..4], &redeemCall::SELECTOR);
        assert_eq!(
            hex::encode(&data[4..36]),
            "00000000000000000000000000000000000000000000000000002d79883d2000"
        );
        // offset of the string, its length, then the padded bytes
        assert_eq!(data[67], 0x40);
        assert_eq!(data[99], 4);
        assert_eq!(&data[100..104], b"QZ1q");
        assert!(data[104..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_encode_redeem_exact_word_string() {
        let destination = "a".repeat(32);
        let data = encode_redeem(1, &destination);
        assert_eq!(data.len(), 4 + 32 * 4);
    }

    #[test]
    fn test_hex_prefix() {
        assert!(encode_redeem_hex(1, "x").starts_with("0x24b76fd5"));
    }
}
