// src/balances.rs
use alloy::primitives::{Address, U256};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::warn;

use crate::error::RpcError;
use crate::models::Balances;
use crate::network::{Endpoints, Network};
use crate::parser::{self, TOKEN_DECIMALS};
use crate::rpc::{self, RpcTransport};

/// keccak256("balanceOf(address)")[..4]
pub const BALANCE_OF_SELECTOR: &str = "70a08231";

/// Fractional digits shown in the account view.
pub const DISPLAY_DECIMALS: u32 = 4;

pub fn encode_balance_of(account: &Address) -> String {
    format!("0x{}{:0>64}", BALANCE_OF_SELECTOR, hex::encode(account.as_slice()))
}

/// An empty `0x` answer (no code at the address) reads as zero.
fn decode_word(hex_str: &str) -> Result<U256, RpcError> {
    match hex_str.trim_start_matches("0x") {
        "" => Ok(U256::ZERO),
        _ => parser::decode_amount(hex_str),
    }
}

pub async fn token_balance(rpc: &dyn RpcTransport, token: &Address, account: &Address) -> Result<U256, RpcError> {
    let raw = rpc::eth_call(rpc, &parser::format_address(token), &encode_balance_of(account)).await?;
    decode_word(&raw)
}

pub async fn native_balance(rpc: &dyn RpcTransport, account: &Address) -> Result<U256, RpcError> {
    let raw = rpc::get_balance(rpc, &parser::format_address(account)).await?;
    decode_word(&raw)
}

/// Round `raw / 10^decimals` to `display_decimals` places (half away from
/// zero) and drop trailing zeros. Values too wide for `Decimal` fall back to
/// the exact, unrounded rendering.
pub fn format_token_balance(raw: U256, decimals: u8, display_decimals: u32) -> String {
    let keep = display_decimals.min(decimals as u32);
    let dropped = decimals as u32 - keep;

    // one guard digit beyond `keep` is enough for half-away rounding
    let (scaled, scale) = if dropped == 0 {
        (raw, keep)
    } else {
        (raw / U256::from(10u64).pow(U256::from(dropped - 1)), keep + 1)
    };

    let rounded = u128::try_from(scaled)
        .ok()
        .and_then(|v| i128::try_from(v).ok())
        .and_then(|v| Decimal::try_from_i128_with_scale(v, scale).ok())
        .map(|d| {
            d.round_dp_with_strategy(keep, RoundingStrategy::MidpointAwayFromZero)
                .normalize()
        });

    match rounded {
        Some(d) => d.to_string(),
        None => parser::format_units(raw, decimals),
    }
}

/// Native balance on mainnet plus token balances on both networks. A failed
/// lookup shows as "0" rather than failing the whole view.
pub async fn fetch_balances(endpoints: &Endpoints, account: &Address) -> Balances {
    let native = async {
        let client = endpoints.get(Network::Mainnet)?;
        native_balance(client.rpc.as_ref(), account).await
    };
    let token_on = |network: Network| async move {
        let client = endpoints.get(network)?;
        token_balance(client.rpc.as_ref(), &client.profile.token_address, account).await
    };

    let (native, mainnet, testnet) =
        tokio::join!(native, token_on(Network::Mainnet), token_on(Network::Testnet));

    let show = |label: &str, res: Result<U256, RpcError>| match res {
        Ok(raw) => format_token_balance(raw, TOKEN_DECIMALS, DISPLAY_DECIMALS),
        Err(e) => {
            warn!("Could not fetch {} balance for {}: {}", label, account, e);
            "0".to_string()
        }
    };

    Balances {
        native: show("native", native),
        token_mainnet: show("mainnet token", mainnet),
        token_testnet: show("testnet token", testnet),
    }
}
