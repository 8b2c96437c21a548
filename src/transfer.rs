// src/transfer.rs
use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::error::TransferError;
use crate::parser::{self, TOKEN_DECIMALS};
use crate::rpc::RpcTransport;

/// keccak256("transfer(address,uint256)")[..4]
pub const TRANSFER_SELECTOR: &str = "a9059cbb";

/// Generous fixed limit for a plain ERC20 transfer.
pub const TRANSFER_GAS_LIMIT: u64 = 100_000;

/// Unsigned `eth_sendTransaction` parameters for a token transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from: String,
    pub to: String,
    pub data: String,
    pub gas: String,
}

/// Accepts only `0x` + 40 hex digits.
pub fn validate_recipient(input: &str) -> Result<Address, TransferError> {
    let input = input.trim();
    let well_formed = input.len() == 42
        && input.starts_with("0x")
        && input[2..].chars().all(|c| c.is_ascii_hexdigit());
    if !well_formed {
        return Err(TransferError::InvalidAddress(input.to_string()));
    }
    input
        .parse::<Address>()
        .map_err(|_| TransferError::InvalidAddress(input.to_string()))
}

/// Positive decimal amount in token units to base units.
pub fn parse_amount(input: &str) -> Result<U256, TransferError> {
    match parser::parse_units(input, TOKEN_DECIMALS) {
        Some(v) if !v.is_zero() => Ok(v),
        _ => Err(TransferError::InvalidAmount(input.trim().to_string())),
    }
}

pub fn encode_transfer_call(recipient: &Address, amount: U256) -> String {
    format!(
        "0x{}{:0>64}{}",
        TRANSFER_SELECTOR,
        hex::encode(recipient.as_slice()),
        hex::encode(amount.to_be_bytes::<32>())
    )
}

/// Validate user input and build the transaction the wallet should sign.
pub fn prepare_transfer(
    from: &Address,
    token: &Address,
    recipient: &str,
    amount: &str,
) -> Result<TransferRequest, TransferError> {
    let recipient = validate_recipient(recipient)?;
    let amount = parse_amount(amount)?;

    Ok(TransferRequest {
        from: parser::format_address(from),
        to: parser::format_address(token),
        data: encode_transfer_call(&recipient, amount),
        gas: format!("0x{:x}", TRANSFER_GAS_LIMIT),
    })
}

/// Hand the request to the connected wallet. Returns the transaction hash.
pub async fn submit_transfer(wallet: &dyn RpcTransport, request: &TransferRequest) -> Result<String, TransferError> {
    info!("Submitting transfer from {} via token {}", request.from, request.to);

    let result = wallet
        .call("eth_sendTransaction", json!([request]))
        .await
        .map_err(|e| {
            warn!("Transfer rejected: {}", e);
            TransferError::from_wallet(e)
        })?;

    match result.as_str() {
        Some(hash) => {
            info!("Transaction sent: {}", hash);
            Ok(hash.to_string())
        }
        None => Err(TransferError::Internal(format!("unexpected wallet response: {result}"))),
    }
}
