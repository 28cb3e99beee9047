//! Native chain address validation

use thiserror::Error;

use crate::params::NativeParams;

/// Kind of a validated native address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeAddressKind {
    P2pkh,
    P2sh,
    Segwit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Invalid {chain} address {address}: {reason}")]
    InvalidAddress {
        chain: String,
        address: String,
        reason: String,
    },
}

fn invalid(params: &NativeParams, address: &str, reason: impl Into<String>) -> AddressError {
    AddressError::InvalidAddress {
        chain: format!("{} {}", params.blockchain, params.network),
        address: address.to_string(),
        reason: reason.into(),
    }
}

/// Rewrite an address using the legacy P2SH version byte to the current one.
///
/// Anything else (including undecodable input) is returned unchanged, so
/// validation reports the real problem.
pub fn remap_legacy_p2sh(address: &str, params: &NativeParams) -> String {
    let Some(legacy) = params.legacy_p2sh_version else {
        return address.to_string();
    };

    match bitcoin::base58::decode_check(address) {
        Ok(mut payload) if payload.len() == 21 && payload[0] == legacy => {
            payload[0] = params.p2sh_version;
            let remapped = bitcoin::base58::encode_check(&payload);
            tracing::debug!(from = %address, to = %remapped, "Remapped legacy P2SH address");
            remapped
        }
        _ => address.to_string(),
    }
}

/// Validate a native address against the network's version bytes and segwit hrp
pub fn validate_address(
    address: &str,
    params: &NativeParams,
) -> Result<NativeAddressKind, AddressError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(invalid(params, address, "empty address"));
    }

    if let Ok(payload) = bitcoin::base58::decode_check(address) {
        if payload.len() != 21 {
            return Err(invalid(
                params,
                address,
                format!("unexpected payload length {}", payload.len()),
            ));
        }
        return match payload[0] {
            v if v == params.p2pkh_version => Ok(NativeAddressKind::P2pkh),
            v if v == params.p2sh_version => Ok(NativeAddressKind::P2sh),
            v => Err(invalid(params, address, format!("unknown version byte 0x{:02x}", v))),
        };
    }

    match bitcoin::bech32::segwit::decode(address) {
        Ok((hrp, _version, _program)) if hrp.to_lowercase() == params.bech32_hrp => {
            Ok(NativeAddressKind::Segwit)
        }
        Ok((hrp, _, _)) => Err(invalid(
            params,
            address,
            format!("segwit prefix {} does not belong to this network", hrp),
        )),
        Err(_) => Err(invalid(params, address, "not a base58check or segwit address")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptokens_core::{Blockchain, Network};

    const HASH: [u8; 20] = [0x11; 20];

    fn encode(version: u8) -> String {
        let mut payload = vec![version];
        payload.extend_from_slice(&HASH);
        bitcoin::base58::encode_check(&payload)
    }

    fn params(blockchain: Blockchain, network: Network) -> NativeParams {
        NativeParams::for_chain(blockchain, network).unwrap()
    }

    #[test]
    fn test_legacy_testnet_p2sh_remapped_to_q() {
        let params = params(Blockchain::Litecoin, Network::Testnet);
        let legacy = encode(0xc4);
        assert!(legacy.starts_with('2'));
        assert!(validate_address(&legacy, &params).is_err());

        let remapped = remap_legacy_p2sh(&legacy, &params);
        assert!(remapped.starts_with('Q'), "{remapped}");
        assert_eq!(remapped, encode(0x3a));
        assert_eq!(validate_address(&remapped, &params), Ok(NativeAddressKind::P2sh));
    }

    #[test]
    fn test_legacy_mainnet_p2sh_remapped() {
        let params = params(Blockchain::Litecoin, Network::Mainnet);
        let remapped = remap_legacy_p2sh(&encode(0x05), &params);
        assert!(remapped.starts_with('M'), "{remapped}");
    }

    #[test]
    fn test_remap_leaves_other_addresses_untouched() {
        let params = params(Blockchain::Litecoin, Network::Testnet);
        assert_eq!(remap_legacy_p2sh("garbage", &params), "garbage");
        let p2pkh = encode(0x6f);
        assert_eq!(remap_legacy_p2sh(&p2pkh, &params), p2pkh);

        // Bitcoin has no legacy version to remap
        let btc = params_btc_testnet();
        assert_eq!(remap_legacy_p2sh(&encode(0xc4), &btc), encode(0xc4));
    }

    fn params_btc_testnet() -> NativeParams {
        params(Blockchain::Bitcoin, Network::Testnet)
    }

    #[test]
    fn test_validate_versions() {
        let params = params(Blockchain::Litecoin, Network::Mainnet);
        assert_eq!(validate_address(&encode(0x30), &params), Ok(NativeAddressKind::P2pkh));
        assert_eq!(validate_address(&encode(0x32), &params), Ok(NativeAddressKind::P2sh));
        // Bitcoin mainnet P2PKH is not a Litecoin address
        assert!(validate_address(&encode(0x00), &params).is_err());
    }

    #[test]
    fn test_validate_segwit() {
        let btc = params(Blockchain::Bitcoin, Network::Mainnet);
        let addr = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";
        assert_eq!(validate_address(addr, &btc), Ok(NativeAddressKind::Segwit));

        let ltc = params(Blockchain::Litecoin, Network::Mainnet);
        assert!(validate_address(addr, &ltc).is_err());
    }

    #[test]
    fn test_validate_rejects_garbage() {
        let params = params(Blockchain::Bitcoin, Network::Testnet);
        assert!(validate_address("", &params).is_err());
        assert!(validate_address("not-an-address", &params).is_err());
    }
}
