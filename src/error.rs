// src/error.rs
use std::time::Duration;
use thiserror::Error;

use crate::network::Network;

/// Errors raised while talking to a JSON-RPC node.
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    /// The node answered with a JSON-RPC `error` object.
    #[error("RPC error {code}: {message}")]
    Protocol { code: i64, message: String },

    /// Connectivity problem or non-success HTTP status.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Malformed hex, topics, hashes or response bodies.
    #[error("decode error: {0}")]
    Decode(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("no RPC endpoint configured for {0}")]
    Unconfigured(Network),
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        RpcError::Decode(err.to_string())
    }
}

/// Errors raised while preparing or submitting a token transfer.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("invalid recipient address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("transaction cancelled by user")]
    UserRejected,

    #[error("transaction error, check your balance and gas fees: {0}")]
    Internal(String),

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl TransferError {
    /// Wallet providers report rejections with EIP-1193 codes; keep the two
    /// the account view distinguishes and pass the rest through.
    pub fn from_wallet(err: RpcError) -> Self {
        match err {
            RpcError::Protocol { code: 4001, .. } => TransferError::UserRejected,
            RpcError::Protocol { code: -32603, message } => TransferError::Internal(message),
            other => TransferError::Rpc(other),
        }
    }
}
