//! Ethereum JSON-RPC host chain client
//!
//! Redeem transactions go through `eth_sendTransaction`, so the RPC
//! endpoint's account manager (a local node or signer proxy) signs them.

use std::time::Duration;

use async_trait::async_trait;
use ptokens_core::{Blockchain, ChainError, TxId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::abi::encode_redeem_hex;
use crate::{HostChain, HostReceipt, RedeemCall};

const SOURCE: &str = "ethereum";

const RPC_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON-RPC request structure
#[derive(Serialize)]
struct JsonRpcRequest<T> {
    jsonrpc: &'static str,
    method: &'static str,
    params: T,
    id: u64,
}

/// JSON-RPC response structure
#[derive(Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Transaction receipt fields used here
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct EthReceipt {
    transaction_hash: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    block_number: Option<String>,
}

/// `eth_sendTransaction` parameter object
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SendTransaction {
    from: String,
    to: String,
    data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    gas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gas_price: Option<String>,
}

fn quantity(value: impl Into<u128>) -> String {
    format!("0x{:x}", value.into())
}

fn parse_quantity(raw: &str) -> Result<u64, ChainError> {
    u64::from_str_radix(raw.trim_start_matches("0x"), 16).map_err(|e| ChainError::ParseError {
        chain: SOURCE.to_string(),
        message: format!("bad quantity {}: {}", raw, e),
    })
}

/// Ethereum host chain over JSON-RPC
pub struct EthRpcClient {
    http: reqwest::Client,
    rpc_url: String,
    account: Option<String>,
}

impl EthRpcClient {
    /// `account` signs redeem transactions; when `None` the first account
    /// exposed by the endpoint is used.
    pub fn new(rpc_url: impl Into<String>, account: Option<String>) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder()
            .timeout(RPC_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ChainError::Unreachable {
                chain: SOURCE.to_string(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            rpc_url: rpc_url.into(),
            account,
        })
    }

    /// Make a JSON-RPC call. `Ok(None)` when the node answers `null`.
    async fn rpc_call<T, R>(&self, method: &'static str, params: T) -> Result<Option<R>, ChainError>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: 1,
        };

        let response = self
            .http
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChainError::Unreachable {
                chain: SOURCE.to_string(),
                message: format!("HTTP request failed: {}", e),
            })?;

        if !response.status().is_success() {
            return Err(ChainError::RpcError {
                chain: SOURCE.to_string(),
                message: format!("{} returned {}", method, response.status()),
            });
        }

        let rpc_response: JsonRpcResponse<R> =
            response.json().await.map_err(|e| ChainError::ParseError {
                chain: SOURCE.to_string(),
                message: format!("Failed to parse {} response: {}", method, e),
            })?;

        if let Some(error) = rpc_response.error {
            return Err(ChainError::RpcError {
                chain: SOURCE.to_string(),
                message: format!("RPC error {}: {}", error.code, error.message),
            });
        }

        Ok(rpc_response.result)
    }

    async fn sender(&self) -> Result<String, ChainError> {
        if let Some(account) = &self.account {
            return Ok(account.clone());
        }

        let accounts: Vec<String> = self
            .rpc_call("eth_accounts", Vec::<()>::new())
            .await?
            .unwrap_or_default();

        accounts.into_iter().next().ok_or_else(|| ChainError::SubmissionFailed {
            chain: SOURCE.to_string(),
            message: "no account available to sign the redeem transaction".to_string(),
        })
    }
}

#[async_trait]
impl HostChain for EthRpcClient {
    fn blockchain(&self) -> Blockchain {
        Blockchain::Ethereum
    }

    async fn submit_redeem(&self, call: &RedeemCall) -> Result<TxId, ChainError> {
        let tx = SendTransaction {
            from: self.sender().await?,
            to: call.contract.clone(),
            data: encode_redeem_hex(call.amount, &call.destination),
            gas: call.options.gas.map(quantity),
            gas_price: call.options.gas_price.map(quantity),
        };

        tracing::info!(
            contract = %call.contract,
            from = %tx.from,
            amount = call.amount,
            destination = %call.destination,
            "Submitting redeem transaction"
        );

        // Node-side rejections (reverts, insufficient funds) are not retried.
        let hash: Option<String> = self
            .rpc_call("eth_sendTransaction", [tx])
            .await
            .map_err(|e| match e {
                ChainError::RpcError { chain, message } => {
                    ChainError::SubmissionFailed { chain, message }
                }
                other => other,
            })?;

        hash.map(TxId::new).ok_or_else(|| ChainError::SubmissionFailed {
            chain: SOURCE.to_string(),
            message: "eth_sendTransaction returned no hash".to_string(),
        })
    }

    async fn transaction_receipt(&self, tx_hash: &str) -> Result<Option<HostReceipt>, ChainError> {
        let receipt: Option<EthReceipt> = self
            .rpc_call("eth_getTransactionReceipt", [tx_hash])
            .await?;

        let Some(receipt) = receipt else {
            return Ok(None);
        };

        let block_number = receipt
            .block_number
            .as_deref()
            .map(parse_quantity)
            .transpose()?;

        // Pre-Byzantium receipts carry no status; a mined receipt counts as success.
        let success = match receipt.status.as_deref() {
            Some(status) => parse_quantity(status)? == 1,
            None => true,
        };

        Ok(Some(HostReceipt {
            tx_hash: TxId::new(receipt.transaction_hash),
            success,
            block_number,
        }))
    }
}
