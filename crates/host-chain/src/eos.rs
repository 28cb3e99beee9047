//! EOSIO host chain client
//!
//! A redeem is a `redeem` action on the pToken contract, with the quantity in
//! EOSIO asset format and the native destination as memo. Signing happens
//! behind the signer endpoint: `POST /v1/transact` takes the actions with
//! their TAPOS settings and pushes the signed transaction, much like
//! `eth_sendTransaction` does for Ethereum. Receipts come from the history
//! plugin.

use std::time::Duration;

use async_trait::async_trait;
use ptokens_core::{format_amount, to_off_chain, Blockchain, ChainError, TxId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{HostChain, HostReceipt, RedeemCall};

const SOURCE: &str = "eosio";

const RPC_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Reference block depth and expiry of redeem transactions
const BLOCKS_BEHIND: u32 = 3;
const EXPIRE_SECONDS: u32 = 60;

/// pToken precision on EOSIO
pub const EOS_TOKEN_DECIMALS: u32 = 8;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub actor: String,
    pub permission: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RedeemData {
    pub sender: String,
    pub quantity: String,
    pub memo: String,
}

/// `redeem` action on the pToken contract
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RedeemAction {
    pub account: String,
    pub name: &'static str,
    pub authorization: Vec<Authorization>,
    pub data: RedeemData,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct TransactRequest<'a> {
    actions: Vec<&'a RedeemAction>,
    blocks_behind: u32,
    expire_seconds: u32,
}

#[derive(Deserialize, Debug)]
struct TransactResponse {
    transaction_id: String,
}

#[derive(Deserialize, Debug)]
struct KeyAccounts {
    #[serde(default)]
    account_names: Vec<String>,
}

/// `/v1/history/get_transaction` fields used here
#[derive(Deserialize, Debug)]
struct HistoryTransaction {
    id: String,
    #[serde(default)]
    block_num: Option<u64>,
    trx: HistoryTrx,
}

#[derive(Deserialize, Debug)]
struct HistoryTrx {
    receipt: TrxReceipt,
}

#[derive(Deserialize, Debug)]
struct TrxReceipt {
    status: String,
}

/// Error body of the EOSIO HTTP API
#[derive(Deserialize, Debug, Default)]
struct ApiErrorBody {
    #[serde(default)]
    error: Option<ApiErrorDetail>,
}

#[derive(Deserialize, Debug, Default)]
struct ApiErrorDetail {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    what: String,
}

impl ApiErrorDetail {
    fn is_unknown_transaction(&self) -> bool {
        self.name.contains("not_found")
            || self.name == "unknown_transaction_exception"
            || self.what.to_ascii_lowercase().contains("not found")
    }
}

/// `amount` host units as an EOSIO asset, e.g. `0.50000000 PLTC`
pub fn format_quantity(amount: u128, symbol: &str) -> Result<String, ChainError> {
    let value = to_off_chain(amount, EOS_TOKEN_DECIMALS).map_err(|e| ChainError::SubmissionFailed {
        chain: SOURCE.to_string(),
        message: format!("amount {} not representable: {}", amount, e),
    })?;
    Ok(format!(
        "{} {}",
        format_amount(value, EOS_TOKEN_DECIMALS),
        symbol.to_uppercase()
    ))
}

fn receipt_from_history(tx: HistoryTransaction) -> HostReceipt {
    HostReceipt {
        tx_hash: TxId::new(tx.id),
        success: tx.trx.receipt.status == "executed",
        block_number: tx.block_num,
    }
}

/// EOSIO host chain over the chain/history HTTP API and a signer endpoint
pub struct EosRpcClient {
    http: reqwest::Client,
    rpc_url: String,
    signer_url: String,
    account: Option<String>,
    symbol: String,
}

impl EosRpcClient {
    /// `signer_url` defaults to `rpc_url`. Without `account`, the actor is
    /// looked up from the signer's available keys via the history plugin.
    pub fn new(
        rpc_url: impl Into<String>,
        signer_url: Option<String>,
        account: Option<String>,
        symbol: impl Into<String>,
    ) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder()
            .timeout(RPC_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ChainError::Unreachable {
                chain: SOURCE.to_string(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        let rpc_url = rpc_url.into().trim_end_matches('/').to_string();
        let signer_url = signer_url
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| rpc_url.clone());

        Ok(Self {
            http,
            rpc_url,
            signer_url,
            account,
            symbol: symbol.into(),
        })
    }

    /// Build the redeem action for `call`, authorised by `actor@active`
    pub fn redeem_action(&self, call: &RedeemCall, actor: &str) -> Result<RedeemAction, ChainError> {
        Ok(RedeemAction {
            account: call.contract.clone(),
            name: "redeem",
            authorization: vec![Authorization {
                actor: actor.to_string(),
                permission: "active".to_string(),
            }],
            data: RedeemData {
                sender: actor.to_string(),
                quantity: format_quantity(call.amount, &self.symbol)?,
                memo: call.destination.clone(),
            },
        })
    }

    async fn post<B, R>(&self, url: String, body: &B) -> Result<R, ChainError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ChainError::Unreachable {
                chain: SOURCE.to_string(),
                message: format!("HTTP request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<ApiErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_default();

            if status == reqwest::StatusCode::NOT_FOUND || detail.is_unknown_transaction() {
                return Err(ChainError::NotFound {
                    chain: SOURCE.to_string(),
                    what: url,
                });
            }
            return Err(ChainError::RpcError {
                chain: SOURCE.to_string(),
                message: format!("{} returned {}: {} ({})", url, status, detail.what, detail.code),
            });
        }

        response.json().await.map_err(|e| ChainError::ParseError {
            chain: SOURCE.to_string(),
            message: format!("Failed to parse {} response: {}", url, e),
        })
    }

    async fn actor(&self) -> Result<String, ChainError> {
        if let Some(account) = &self.account {
            return Ok(account.clone());
        }

        let keys: Vec<String> = self
            .post(
                format!("{}/v1/get_available_keys", self.signer_url),
                &serde_json::json!({}),
            )
            .await?;

        for key in keys {
            let accounts: KeyAccounts = self
                .post(
                    format!("{}/v1/history/get_key_accounts", self.rpc_url),
                    &serde_json::json!({ "public_key": key }),
                )
                .await?;
            if let Some(name) = accounts.account_names.into_iter().next() {
                tracing::debug!(account = %name, "Resolved EOSIO account from signer key");
                return Ok(name);
            }
        }

        Err(ChainError::SubmissionFailed {
            chain: SOURCE.to_string(),
            message: "no account found for the signer keys; configure one or enable the history plugin"
                .to_string(),
        })
    }
}

#[async_trait]
impl HostChain for EosRpcClient {
    fn blockchain(&self) -> Blockchain {
        Blockchain::Eosio
    }

    async fn submit_redeem(&self, call: &RedeemCall) -> Result<TxId, ChainError> {
        let actor = self.actor().await?;
        let action = self.redeem_action(call, &actor)?;
        let request = TransactRequest {
            actions: vec![&action],
            blocks_behind: BLOCKS_BEHIND,
            expire_seconds: EXPIRE_SECONDS,
        };

        tracing::info!(
            contract = %call.contract,
            actor = %actor,
            quantity = %action.data.quantity,
            destination = %call.destination,
            "Submitting redeem action"
        );

        let response: TransactResponse = self
            .post(format!("{}/v1/transact", self.signer_url), &request)
            .await
            .map_err(|e| match e {
                ChainError::RpcError { chain, message } | ChainError::NotFound { chain, what: message } => {
                    ChainError::SubmissionFailed { chain, message }
                }
                other => other,
            })?;

        Ok(TxId::new(response.transaction_id))
    }

    async fn transaction_receipt(&self, tx_hash: &str) -> Result<Option<HostReceipt>, ChainError> {
        let result: Result<HistoryTransaction, ChainError> = self
            .post(
                format!("{}/v1/history/get_transaction", self.rpc_url),
                &serde_json::json!({ "id": tx_hash }),
            )
            .await;

        match result {
            Ok(tx) => Ok(Some(receipt_from_history(tx))),
            Err(ChainError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
