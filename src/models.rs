// src/models.rs
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransferKind {
    Received,
    Sent,
}

/// Only confirmed logs are queried, so nothing else is derivable yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TxStatus {
    Success,
}

/// A single ERC20 transfer touching the queried account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub hash: String,
    pub from: String,
    pub to: String,
    pub value: String, // token units, exact decimal
    #[serde(serialize_with = "as_decimal_string")]
    pub timestamp: u64, // ms since epoch
    pub block_number: u64,
    #[serde(rename = "type")]
    pub kind: TransferKind,
    pub status: TxStatus,
    pub date: String, // ISO-8601
}

/// Result of a history fetch. Logs that could not be resolved are counted in
/// `dropped` and described in `errors` instead of failing the whole call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct History {
    pub transactions: Vec<Transaction>,
    pub dropped: usize,
    pub errors: Vec<String>,
}

impl History {
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

/// Display balances for the account view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Balances {
    pub native: String,
    pub token_mainnet: String,
    pub token_testnet: String,
}

fn as_decimal_string<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}
