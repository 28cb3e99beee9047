//! pLTC: Litecoin pegged on Ethereum (ERC-20) and EOSIO
//!
//! Issue: deposit LTC to a verified deposit address, receive pLTC on the host
//! chain. Redeem: burn pLTC with a Litecoin destination, receive LTC.
//!
//! Destinations using the Bitcoin P2SH version byte (`2...` on testnet,
//! `3...` on mainnet) are accepted and remapped to their Litecoin form
//! (`Q...`, `M...`) before validation.
//!
//! # Example
//!
//! ```ignore
//! let pltc = PLtc::new(&ClientConfig::from_file("pltc.json")?)?;
//! let deposit = pltc.get_deposit_address("0xfedf...dcac").await?;
//! let mut handle = pltc.wait_for_deposit(&deposit, None);
//! while let Some(event) = handle.next_event().await {
//!     println!("{}", event.stage());
//! }
//! ```

pub mod constants;

use std::time::Duration;

use bridge_node_client::SelectedNode;
use ptokens_core::{ClientConfig, Error, PToken, TransferError};
use ptokens_transfer::{
    DepositAddress, IssueResult, PTokenClient, RedeemOptions, RedeemResult, TransferHandle,
};
use rust_decimal::Decimal;

pub use constants::MINIMUM_LTC_REDEEMABLE;

pub struct PLtc {
    client: PTokenClient,
}

impl PLtc {
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        if config.ptoken != PToken::Pltc {
            return Err(Error::Config(format!(
                "pLTC client configured for {}",
                config.ptoken
            )));
        }
        let client = PTokenClient::from_client_config(config, MINIMUM_LTC_REDEEMABLE)?;
        Ok(Self { client })
    }

    /// Wrap an already composed client
    pub fn from_client(client: PTokenClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &PTokenClient {
        &self.client
    }

    pub async fn select(&self) -> Result<SelectedNode, TransferError> {
        self.client.select_node().await
    }

    pub async fn get_deposit_address(
        &self,
        host_address: &str,
    ) -> Result<DepositAddress, TransferError> {
        self.client.get_deposit_address(host_address).await
    }

    pub fn wait_for_deposit(
        &self,
        deposit: &DepositAddress,
        max_wait: Option<Duration>,
    ) -> TransferHandle<IssueResult> {
        self.client.wait_for_deposit(deposit, max_wait)
    }

    /// Redeem `amount` pLTC to `ltc_address`
    pub fn redeem(
        &self,
        amount: Decimal,
        ltc_address: &str,
        options: RedeemOptions,
    ) -> TransferHandle<RedeemResult> {
        tracing::debug!(amount = %amount, destination = %ltc_address, "pLTC redeem requested");
        self.client.redeem(amount, ltc_address, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptokens_core::Network;
    use std::str::FromStr;

    fn testnet() -> PLtc {
        let config = ClientConfig {
            ptoken: PToken::Pltc,
            network: Network::Testnet,
            // nothing listens here: any network call would fail
            nodes: vec!["http://127.0.0.1:9".into()],
            ..ClientConfig::default()
        };
        PLtc::new(&config).unwrap()
    }

    fn encode(version: u8) -> String {
        let mut payload = vec![version];
        payload.extend_from_slice(&[0x5a; 20]);
        bitcoin::base58::encode_check(&payload)
    }

    #[tokio::test]
    async fn test_redeem_below_minimum_fails_immediately() {
        let pltc = testnet();
        let mut handle = pltc.redeem(
            Decimal::from_str("0.00001").unwrap(),
            &encode(0x3a),
            RedeemOptions::default(),
        );

        assert!(handle.status().is_terminal());
        let err = handle.result().await.unwrap_err();
        assert_eq!(err.error_code(), "below_minimum");
        assert_eq!(
            err.to_string(),
            "Impossible to redeem less than 0.00005 pLTC (requested 0.00001)"
        );
        assert!(pltc.client().selector().selected().await.is_none());
    }

    #[test]
    fn test_legacy_testnet_destination_remapped() {
        let pltc = testnet();
        let legacy = encode(0xc4);
        assert!(legacy.starts_with('2'));

        let amount = pltc
            .client()
            .redeem_rules()
            .check(Decimal::from_str("0.001").unwrap(), &legacy)
            .unwrap();
        assert_eq!(amount, 1_000_000_000_000_000);
    }

    #[tokio::test]
    async fn test_destination_invalid_after_remap() {
        let pltc = testnet();
        // Litecoin mainnet P2PKH on testnet
        let mut handle = pltc.redeem(Decimal::ONE, &encode(0x30), RedeemOptions::default());
        assert_eq!(handle.result().await.unwrap_err().error_code(), "invalid_address");
    }

    #[test]
    fn test_rejects_other_ptoken_config() {
        let config = ClientConfig {
            ptoken: PToken::Pbtc,
            nodes: vec!["http://127.0.0.1:9".into()],
            ..ClientConfig::default()
        };
        assert!(matches!(PLtc::new(&config), Err(Error::Config(_))));
    }
}
