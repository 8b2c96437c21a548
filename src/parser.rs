// src/parser.rs
use alloy::primitives::{Address, U256};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::RpcError;
use crate::rpc::Log;

/// $HAIR uses the usual 18 decimals.
pub const TOKEN_DECIMALS: u8 = 18;

/// Which `eth_getLogs` query produced a log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// A raw log tagged with the query that returned it.
#[derive(Debug, Clone)]
pub struct TaggedLog {
    pub log: Log,
    pub direction: Direction,
}

fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s)
}

/// Lowercase `0x`-prefixed form used in every output record.
pub fn format_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_slice()))
}

/// 20-byte address left-padded to a 32-byte topic.
pub fn address_to_topic(address: &Address) -> String {
    format!("0x000000000000000000000000{}", hex::encode(address.as_slice()))
}

pub fn topic_to_address(topic: &str) -> Result<Address, RpcError> {
    // address is the last 20 bytes of the padded topic
    let bytes = hex::decode(strip_0x(topic))
        .map_err(|e| RpcError::Decode(format!("topic {topic}: {e}")))?;
    if bytes.len() != 32 {
        return Err(RpcError::Decode(format!("topic {topic}: expected 32 bytes, got {}", bytes.len())));
    }
    Ok(Address::from_slice(&bytes[12..]))
}

/// Checks that `hash` is a 32-byte hex string.
pub fn validate_tx_hash(hash: &str) -> Result<(), RpcError> {
    let bytes = hex::decode(strip_0x(hash))
        .map_err(|e| RpcError::Decode(format!("transaction hash {hash}: {e}")))?;
    if bytes.len() != 32 {
        return Err(RpcError::Decode(format!("transaction hash {hash}: expected 32 bytes")));
    }
    Ok(())
}

/// Hex quantity (`0x1b4`) to integer.
pub fn parse_quantity(hex_str: &str) -> Result<u64, RpcError> {
    u64::from_str_radix(strip_0x(hex_str), 16)
        .map_err(|e| RpcError::Decode(format!("quantity {hex_str}: {e}")))
}

/// Big-endian uint256 from log data.
pub fn decode_amount(data: &str) -> Result<U256, RpcError> {
    let digits = strip_0x(data);
    if digits.is_empty() {
        return Err(RpcError::Decode("empty log data".to_string()));
    }
    U256::from_str_radix(digits, 16).map_err(|e| RpcError::Decode(format!("log data {data}: {e}")))
}

fn pow10(exp: u32) -> U256 {
    U256::from(10u64).pow(U256::from(exp))
}

/// Exact decimal rendering of `value / 10^decimals`, trailing zeros trimmed.
pub fn format_units(value: U256, decimals: u8) -> String {
    let base = pow10(decimals as u32);
    let whole = value / base;
    let frac = value % base;
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// Decimal string (`"1.5"`) to base units. `None` on anything that is not a
/// plain non-negative decimal with at most `decimals` fractional digits.
pub fn parse_units(amount: &str, decimals: u8) -> Option<U256> {
    let amount = amount.trim();
    let (whole, frac) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }
    if frac.len() > decimals as usize {
        return None;
    }

    let whole = if whole.is_empty() { U256::ZERO } else { U256::from_str_radix(whole, 10).ok()? };
    let padded = format!("{:0<width$}", frac, width = decimals as usize);
    let frac = if padded.is_empty() { U256::ZERO } else { U256::from_str_radix(&padded, 10).ok()? };

    whole.checked_mul(pow10(decimals as u32))?.checked_add(frac)
}

/// Sender and recipient of a tagged log, as seen from `account`.
pub fn counterparties(tagged: &TaggedLog, account: &Address) -> Result<(Address, Address), RpcError> {
    let topics = &tagged.log.topics;
    if topics.len() < 3 {
        return Err(RpcError::Decode(format!("expected 3 topics, got {}", topics.len())));
    }
    match tagged.direction {
        Direction::Incoming => Ok((topic_to_address(&topics[1])?, *account)),
        Direction::Outgoing => Ok((*account, topic_to_address(&topics[2])?)),
    }
}

/// Block timestamp (hex seconds) to milliseconds since the epoch.
pub fn block_time_millis(timestamp_hex: &str) -> Result<u64, RpcError> {
    parse_quantity(timestamp_hex)?
        .checked_mul(1000)
        .ok_or_else(|| RpcError::Decode(format!("timestamp {timestamp_hex} out of range")))
}

/// ISO-8601 with millisecond precision and a `Z` suffix.
pub fn iso_date(millis: u64) -> Result<String, RpcError> {
    i64::try_from(millis)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .ok_or_else(|| RpcError::Decode(format!("timestamp {millis} out of range")))
}
