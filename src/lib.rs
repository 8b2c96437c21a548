//! Account-side services for the $HAIR token on Hemi Network: rate-limited
//! JSON-RPC access, transfer history reconstruction from `Transfer` logs,
//! balances, and transfer preparation for a connected wallet.

pub mod api;
pub mod balances;
pub mod config;
pub mod error;
pub mod models;
pub mod network;
pub mod parser;
pub mod rate_limiter;
pub mod resolver;
pub mod rpc;
pub mod transfer;

pub use error::{RpcError, TransferError};
pub use models::{Balances, History, Transaction, TransferKind, TxStatus};
pub use network::{Endpoints, Network, NetworkProfile, Networks};
pub use rate_limiter::RateLimiter;
pub use resolver::TransactionResolver;
