// src/rpc.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::RpcError;
use crate::rate_limiter::RateLimiter;

/// ERC20 Transfer event topic keccak256("Transfer(address,address,uint256)")
pub const TRANSFER_TOPIC: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

/// Anything that answers JSON-RPC calls: an HTTP node, a browser wallet
/// bridge, or a scripted double in tests.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Returns the `result` member of the response, or the node's `error`
    /// object as [`RpcError::Protocol`].
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError>;
}

#[async_trait]
impl<T: RpcTransport + ?Sized> RpcTransport for Arc<T> {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        (**self).call(method, params).await
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RpcResponse {
    Error { error: RpcErrorObject },
    Success { result: Value },
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    #[serde(default)]
    code: i64,
    message: String,
}

/// Turn a raw response body into the call result.
pub fn parse_response(body: &str) -> Result<Value, RpcError> {
    match serde_json::from_str::<RpcResponse>(body)? {
        RpcResponse::Success { result } => Ok(result),
        RpcResponse::Error { error } => Err(RpcError::Protocol {
            code: error.code,
            message: error.message,
        }),
    }
}

/// JSON-RPC over HTTP POST.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn transport_error(&self, err: reqwest::Error) -> RpcError {
        if err.is_timeout() {
            RpcError::Timeout(self.timeout)
        } else {
            RpcError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        debug!("Sending {} → {}", method, self.url);

        let resp = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RpcError::Transport(format!("HTTP {status}")));
        }

        let text = resp.text().await.map_err(|e| self.transport_error(e))?;
        debug!("Raw {} response: {}", method, text);

        parse_response(&text)
    }
}

/// Routes every call through a shared [`RateLimiter`].
pub struct RateLimitedTransport<T> {
    inner: T,
    limiter: Arc<RateLimiter>,
}

impl<T> RateLimitedTransport<T> {
    pub fn new(inner: T, limiter: Arc<RateLimiter>) -> Self {
        Self { inner, limiter }
    }
}

#[async_trait]
impl<T: RpcTransport> RpcTransport for RateLimitedTransport<T> {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        self.limiter
            .gated_fetch(|| self.inner.call(method, params))
            .await
    }
}

// ---------- wire types ----------

#[derive(Debug, Deserialize, Clone)]
pub struct Log {
    pub topics: Vec<String>,
    pub data: String,

    #[serde(rename = "transactionHash")]
    pub tx_hash: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RpcTransaction {
    pub hash: String,

    /// `None` while the transaction is pending.
    #[serde(rename = "blockNumber")]
    pub block_number: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RpcBlock {
    pub timestamp: String,
}

/// `eth_getLogs` filter for Transfer events of one token contract.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferFilter {
    pub from_block: String,
    pub to_block: String,
    pub address: String,
    pub topics: [Option<String>; 3],
}

impl TransferFilter {
    /// Whole-history scan: genesis to latest.
    pub fn new(token: String, from_topic: Option<String>, to_topic: Option<String>) -> Self {
        Self {
            from_block: "0x0".to_string(),
            to_block: "latest".to_string(),
            address: token,
            topics: [Some(TRANSFER_TOPIC.to_string()), from_topic, to_topic],
        }
    }
}

// ---------- typed calls ----------

/// Raw log entries. Only the outer array is checked here; each entry is
/// decoded into a [`Log`] by the caller so one bad entry cannot sink the batch.
pub async fn get_logs(rpc: &dyn RpcTransport, filter: &TransferFilter) -> Result<Vec<Value>, RpcError> {
    let result = rpc.call("eth_getLogs", json!([filter])).await?;
    if result.is_null() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_value(result)?)
}

pub async fn get_transaction_by_hash(rpc: &dyn RpcTransport, hash: &str) -> Result<RpcTransaction, RpcError> {
    let result = rpc.call("eth_getTransactionByHash", json!([hash])).await?;
    if result.is_null() {
        return Err(RpcError::NotFound(format!("transaction {hash}")));
    }
    Ok(serde_json::from_value(result)?)
}

pub async fn get_block_by_number(rpc: &dyn RpcTransport, number: &str) -> Result<RpcBlock, RpcError> {
    let result = rpc.call("eth_getBlockByNumber", json!([number, false])).await?;
    if result.is_null() {
        return Err(RpcError::NotFound(format!("block {number}")));
    }
    Ok(serde_json::from_value(result)?)
}

pub async fn get_balance(rpc: &dyn RpcTransport, address: &str) -> Result<String, RpcError> {
    let result = rpc.call("eth_getBalance", json!([address, "latest"])).await?;
    as_hex_string(result, "eth_getBalance")
}

pub async fn eth_call(rpc: &dyn RpcTransport, to: &str, data: &str) -> Result<String, RpcError> {
    let result = rpc
        .call("eth_call", json!([{ "to": to, "data": data }, "latest"]))
        .await?;
    as_hex_string(result, "eth_call")
}

fn as_hex_string(value: Value, method: &str) -> Result<String, RpcError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(RpcError::Decode(format!("{method}: expected hex string, got {other}"))),
    }
}
