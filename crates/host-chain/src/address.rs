//! Host address validation and the byte form committed to by deposit scripts

use ptokens_core::{Blockchain, TransferError};

fn invalid(chain: Blockchain, address: &str, reason: impl Into<String>) -> TransferError {
    TransferError::InvalidAddress {
        chain: chain.to_string(),
        address: address.to_string(),
        reason: reason.into(),
    }
}

/// Check that `address` is well-formed for the host chain
pub fn validate_host_address(chain: Blockchain, address: &str) -> Result<(), TransferError> {
    if address.is_empty() {
        return Err(invalid(chain, address, "address cannot be empty"));
    }

    match chain {
        Blockchain::Ethereum => {
            let Some(body) = address.strip_prefix("0x") else {
                return Err(invalid(chain, address, "Ethereum address must start with '0x'"));
            };
            if body.len() != 40 {
                return Err(invalid(
                    chain,
                    address,
                    "Ethereum address must be 42 characters (0x + 40 hex)",
                ));
            }
            if !body.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(invalid(chain, address, "Ethereum address contains non-hex characters"));
            }
        }
        Blockchain::Eosio => {
            if address.len() > 12 {
                return Err(invalid(chain, address, "EOSIO account name is at most 12 characters"));
            }
            if !address
                .chars()
                .all(|c| c.is_ascii_lowercase() || ('1'..='5').contains(&c) || c == '.')
            {
                return Err(invalid(
                    chain,
                    address,
                    "EOSIO account name may only contain a-z, 1-5 and '.'",
                ));
            }
            if address.ends_with('.') {
                return Err(invalid(chain, address, "EOSIO account name cannot end with '.'"));
            }
        }
        Blockchain::Bitcoin | Blockchain::Litecoin => {
            return Err(invalid(chain, address, "not a host blockchain"));
        }
    }

    Ok(())
}

/// Bytes of a host address as hashed into a deposit script.
///
/// Ethereum: the 20 address bytes. EOSIO: the UTF-8 account name.
pub fn host_address_bytes(chain: Blockchain, address: &str) -> Result<Vec<u8>, TransferError> {
    validate_host_address(chain, address)?;
    match chain {
        Blockchain::Ethereum => hex::decode(&address[2..])
            .map_err(|e| invalid(chain, address, e.to_string())),
        _ => Ok(address.as_bytes().to_vec()),
    }
}

/// Decimals of the pToken contract on the host chain
pub fn host_decimals(chain: Blockchain) -> u32 {
    match chain {
        Blockchain::Ethereum => 18,
        _ => 8,
    }
}
