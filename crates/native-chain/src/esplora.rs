//! Esplora explorer client for the native chain

use std::time::Duration;

use async_trait::async_trait;
use ptokens_core::{BlockHeight, ChainError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const EXPLORER_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SOURCE: &str = "esplora";

/// Confirmation status of a native transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxStatus {
    pub confirmed: bool,
    #[serde(default)]
    pub block_height: Option<BlockHeight>,
    #[serde(default)]
    pub block_hash: Option<String>,
}

/// Mempool transaction touching an address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MempoolTx {
    pub txid: String,
}

/// Unspent output held by an address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    /// Satoshis
    pub value: u64,
    #[serde(default)]
    pub status: TxStatus,
}

/// Read access to the native chain used by the transfer monitor
#[async_trait]
pub trait NativeExplorer: Send + Sync {
    /// Unconfirmed transactions paying to or spending from `address`
    async fn mempool_txs(&self, address: &str) -> Result<Vec<MempoolTx>, ChainError>;

    /// Unspent outputs of `address`
    async fn utxos(&self, address: &str) -> Result<Vec<Utxo>, ChainError>;

    /// Status of one transaction. `NotFound` while the explorer has not seen it.
    async fn tx_status(&self, txid: &str) -> Result<TxStatus, ChainError>;
}

/// HTTP client for an Esplora instance (Blockstream, litecoinspace, self-hosted)
#[derive(Clone)]
pub struct EsploraClient {
    http: reqwest::Client,
    base_url: String,
}

impl EsploraClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder()
            .timeout(EXPLORER_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ChainError::Unreachable {
                chain: SOURCE.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ChainError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ChainError::Unreachable {
                chain: SOURCE.to_string(),
                message: format!("{}: {}", url, e),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ChainError::NotFound {
                chain: SOURCE.to_string(),
                what: path.to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChainError::RpcError {
                chain: SOURCE.to_string(),
                message: format!("{} returned {}: {}", url, status, body),
            });
        }

        response.json().await.map_err(|e| ChainError::ParseError {
            chain: SOURCE.to_string(),
            message: format!("{}: {}", url, e),
        })
    }
}

#[async_trait]
impl NativeExplorer for EsploraClient {
    async fn mempool_txs(&self, address: &str) -> Result<Vec<MempoolTx>, ChainError> {
        self.get_json(&format!("/address/{}/txs/mempool", address))
            .await
    }

    async fn utxos(&self, address: &str) -> Result<Vec<Utxo>, ChainError> {
        self.get_json(&format!("/address/{}/utxo", address)).await
    }

    async fn tx_status(&self, txid: &str) -> Result<TxStatus, ChainError> {
        self.get_json(&format!("/tx/{}/status", txid)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_utxo() {
        let utxos: Vec<Utxo> = serde_json::from_str(
            r#"[{"txid":"9d5c","vout":0,"value":150000,
                 "status":{"confirmed":true,"block_height":1838801,"block_hash":"00ab","block_time":1589384522}}]"#,
        )
        .unwrap();
        assert_eq!(utxos[0].value, 150_000);
        assert!(utxos[0].status.confirmed);
        assert_eq!(utxos[0].status.block_height, Some(1_838_801));
    }

    #[test]
    fn test_parse_mempool_ignores_extra_fields() {
        let txs: Vec<MempoolTx> =
            serde_json::from_str(r#"[{"txid":"61b2","version":2,"fee":141}]"#).unwrap();
        assert_eq!(txs[0].txid, "61b2");
    }

    #[test]
    fn test_parse_unconfirmed_status() {
        let status: TxStatus = serde_json::from_str(r#"{"confirmed":false}"#).unwrap();
        assert!(!status.confirmed);
        assert!(status.block_height.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_explorer_is_transient() {
        let client = EsploraClient::new("http://127.0.0.1:9/").unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:9");
        let err = client.tx_status("00").await.unwrap_err();
        assert!(err.is_transient());
    }
}
