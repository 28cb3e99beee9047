//! Per-chain, per-network address parameters

use ptokens_core::{Blockchain, Network};

/// Satoshi-style granularity shared by Bitcoin and Litecoin
pub const NATIVE_DECIMALS: u32 = 8;

/// Address encoding parameters for one native chain on one network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeParams {
    pub blockchain: Blockchain,
    pub network: Network,
    /// Base58check version byte of pay-to-pubkey-hash addresses
    pub p2pkh_version: u8,
    /// Base58check version byte of pay-to-script-hash addresses
    pub p2sh_version: u8,
    /// Older P2SH version still emitted by some wallets, remapped before validation
    pub legacy_p2sh_version: Option<u8>,
    /// Human-readable part of segwit addresses
    pub bech32_hrp: &'static str,
    /// Public Esplora instance used when none is configured
    pub default_explorer_url: &'static str,
}

impl NativeParams {
    /// Parameters for a UTXO chain; `None` for account-based chains
    pub fn for_chain(blockchain: Blockchain, network: Network) -> Option<Self> {
        let params = match (blockchain, network) {
            (Blockchain::Bitcoin, Network::Mainnet) => Self {
                blockchain,
                network,
                p2pkh_version: 0x00,
                p2sh_version: 0x05,
                legacy_p2sh_version: None,
                bech32_hrp: "bc",
                default_explorer_url: "https://blockstream.info/api",
            },
            (Blockchain::Bitcoin, Network::Testnet) => Self {
                blockchain,
                network,
                p2pkh_version: 0x6f,
                p2sh_version: 0xc4,
                legacy_p2sh_version: None,
                bech32_hrp: "tb",
                default_explorer_url: "https://blockstream.info/testnet/api",
            },
            (Blockchain::Litecoin, Network::Mainnet) => Self {
                blockchain,
                network,
                p2pkh_version: 0x30,
                p2sh_version: 0x32,
                legacy_p2sh_version: Some(0x05),
                bech32_hrp: "ltc",
                default_explorer_url: "https://litecoinspace.org/api",
            },
            (Blockchain::Litecoin, Network::Testnet) => Self {
                blockchain,
                network,
                p2pkh_version: 0x6f,
                p2sh_version: 0x3a,
                legacy_p2sh_version: Some(0xc4),
                bech32_hrp: "tltc",
                default_explorer_url: "https://litecoinspace.org/testnet/api",
            },
            _ => return None,
        };
        Some(params)
    }

    pub fn decimals(&self) -> u32 {
        NATIVE_DECIMALS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_chains_have_no_params() {
        assert!(NativeParams::for_chain(Blockchain::Ethereum, Network::Mainnet).is_none());
        assert!(NativeParams::for_chain(Blockchain::Eosio, Network::Testnet).is_none());
    }

    #[test]
    fn test_litecoin_testnet_params() {
        let params = NativeParams::for_chain(Blockchain::Litecoin, Network::Testnet).unwrap();
        assert_eq!(params.p2sh_version, 0x3a);
        assert_eq!(params.legacy_p2sh_version, Some(0xc4));
        assert_eq!(params.decimals(), 8);
    }
}
