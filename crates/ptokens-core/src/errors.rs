//! Error types for the pTokens client

use thiserror::Error;

/// Core errors that can occur in the pTokens client
#[derive(Debug, Error)]
pub enum Error {
    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Bridge node connection and query errors
#[derive(Debug, Clone, Error)]
pub enum NodeError {
    #[error("Node unreachable at {url}")]
    Unreachable { url: String },

    #[error("Node returned error: {message}")]
    ApiError { message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Not found on node: {what}")]
    NotFound { what: String },
}

/// Native explorer and host RPC errors
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("{chain} RPC unreachable: {message}")]
    Unreachable { chain: String, message: String },

    #[error("{chain} RPC returned error: {message}")]
    RpcError { chain: String, message: String },

    #[error("Failed to parse {chain} response: {message}")]
    ParseError { chain: String, message: String },

    #[error("Not found on {chain}: {what}")]
    NotFound { chain: String, what: String },

    #[error("{chain} submission failed: {message}")]
    SubmissionFailed { chain: String, message: String },
}

/// Errors surfaced by deposit, monitoring and redeem operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransferError {
    #[error("No node available for {pairing}: {reason}")]
    NoNodeAvailable { pairing: String, reason: String },

    #[error("Node deposit address {received} does not match expected address {expected}")]
    AddressMismatch { expected: String, received: String },

    #[error("Invalid {chain} address {address}: {reason}")]
    InvalidAddress {
        chain: String,
        address: String,
        reason: String,
    },

    #[error("Impossible to redeem less than {minimum} {symbol} (requested {amount})")]
    BelowMinimum {
        amount: String,
        minimum: String,
        symbol: String,
    },

    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    #[error("Node reported failure: {message}")]
    NodeReportedFailure { message: String },

    #[error("Unexpected response from {source_name}: {message}")]
    UnexpectedResponse {
        source_name: String,
        message: String,
    },

    #[error("Submission failed: {message}")]
    SubmissionFailed { message: String },

    #[error("Host transaction {tx_hash} failed")]
    HostTxFailed { tx_hash: String },

    #[error("Transient fetch error from {source_name}: {message}")]
    TransientFetch {
        source_name: String,
        message: String,
    },

    #[error("Timed out after {waited_secs}s while {stage}")]
    Timeout { stage: String, waited_secs: u64 },

    #[error("Transfer cancelled")]
    Cancelled,
}

/// Result type alias for pTokens operations
pub type Result<T> = std::result::Result<T, Error>;

impl NodeError {
    /// Whether a retry may succeed (network hiccup rather than a bad answer)
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::ApiError { .. })
    }
}

impl ChainError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::RpcError { .. })
    }
}

impl TransferError {
    /// Get a stable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoNodeAvailable { .. } => "no_node_available",
            Self::AddressMismatch { .. } => "address_mismatch",
            Self::InvalidAddress { .. } => "invalid_address",
            Self::BelowMinimum { .. } => "below_minimum",
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::NodeReportedFailure { .. } => "node_reported_failure",
            Self::UnexpectedResponse { .. } => "unexpected_response",
            Self::SubmissionFailed { .. } => "submission_failed",
            Self::HostTxFailed { .. } => "host_tx_failed",
            Self::TransientFetch { .. } => "transient_fetch_error",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled => "cancelled",
        }
    }

    /// Only transient fetch errors are retried inside poll loops
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientFetch { .. })
    }

    /// Errors caused by caller input rather than by the chains or the node
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidAddress { .. } | Self::BelowMinimum { .. } | Self::InvalidAmount { .. }
        )
    }
}

impl From<NodeError> for TransferError {
    fn from(e: NodeError) -> Self {
        if e.is_transient() {
            Self::TransientFetch {
                source_name: "bridge node".to_string(),
                message: e.to_string(),
            }
        } else {
            Self::NodeReportedFailure {
                message: e.to_string(),
            }
        }
    }
}

impl From<ChainError> for TransferError {
    fn from(e: ChainError) -> Self {
        match e {
            ChainError::Unreachable { ref chain, .. } | ChainError::RpcError { ref chain, .. } => {
                Self::TransientFetch {
                    source_name: chain.clone(),
                    message: e.to_string(),
                }
            }
            ChainError::SubmissionFailed { message, .. } => Self::SubmissionFailed { message },
            ChainError::ParseError { ref chain, .. } | ChainError::NotFound { ref chain, .. } => {
                Self::UnexpectedResponse {
                    source_name: chain.clone(),
                    message: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_error_codes() {
        let err = TransferError::BelowMinimum {
            amount: "0.00001".into(),
            minimum: "0.00005".into(),
            symbol: "pLTC".into(),
        };
        assert_eq!(err.error_code(), "below_minimum");
        assert!(err.is_user_error());
        assert!(!err.is_transient());
        assert_eq!(
            err.to_string(),
            "Impossible to redeem less than 0.00005 pLTC (requested 0.00001)"
        );
    }

    #[test]
    fn test_node_error_classification() {
        let transient: TransferError = NodeError::Unreachable {
            url: "https://node".into(),
        }
        .into();
        assert!(transient.is_transient());

        let fatal: TransferError = NodeError::ParseError("bad json".into()).into();
        assert_eq!(fatal.error_code(), "node_reported_failure");
    }

    #[test]
    fn test_chain_error_classification() {
        let transient: TransferError = ChainError::RpcError {
            chain: "esplora".into(),
            message: "502".into(),
        }
        .into();
        assert!(transient.is_transient());

        let fatal: TransferError = ChainError::SubmissionFailed {
            chain: "ethereum".into(),
            message: "insufficient funds".into(),
        }
        .into();
        assert!(!fatal.is_transient());
        assert_eq!(fatal.error_code(), "submission_failed");

        let parse: TransferError = ChainError::ParseError {
            chain: "esplora".into(),
            message: "expected array".into(),
        }
        .into();
        assert_eq!(parse.error_code(), "unexpected_response");
    }
}
