//! pBTC: Bitcoin pegged on Ethereum (ERC-20) and EOSIO
//!
//! Issue: deposit BTC to a verified P2SH deposit address, receive pBTC.
//! Redeem: burn pBTC with a Bitcoin destination (P2PKH, P2SH or segwit).

pub mod constants;

use std::time::Duration;

use bridge_node_client::SelectedNode;
use ptokens_core::{ClientConfig, Error, PToken, TransferError};
use ptokens_transfer::{
    DepositAddress, IssueResult, PTokenClient, RedeemOptions, RedeemResult, TransferHandle,
};
use rust_decimal::Decimal;

pub use constants::MINIMUM_BTC_REDEEMABLE;

pub struct PBtc {
    client: PTokenClient,
}

impl PBtc {
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        if config.ptoken != PToken::Pbtc {
            return Err(Error::Config(format!(
                "pBTC client configured for {}",
                config.ptoken
            )));
        }
        let client = PTokenClient::from_client_config(config, MINIMUM_BTC_REDEEMABLE)?;
        Ok(Self { client })
    }

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

    /// Redeem `amount` pBTC to `btc_address`
    pub fn redeem(
        &self,
        amount: Decimal,
        btc_address: &str,
        options: RedeemOptions,
    ) -> TransferHandle<RedeemResult> {
        tracing::debug!(amount = %amount, destination = %btc_address, "pBTC redeem requested");
        self.client.redeem(amount, btc_address, options)
    }
}
