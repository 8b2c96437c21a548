#![allow(dead_code)]

use alloy::primitives::Address;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use token_account::network::{NetworkProfile, TOKEN_MAINNET, TOKEN_TESTNET};
use token_account::rpc::{RpcTransport, TRANSFER_TOPIC};
use token_account::{Endpoints, Network, RpcError};

pub const ACCOUNT: &str = "0x1111111111111111111111111111111111111111";
pub const PEER: &str = "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd";
pub const ONE_TOKEN: u128 = 1_000_000_000_000_000_000;

pub fn account() -> Address {
    ACCOUNT.parse().unwrap()
}

pub fn topic(address: &str) -> String {
    format!("0x000000000000000000000000{}", &address[2..])
}

pub fn hash(n: u64) -> String {
    format!("0x{:064x}", n)
}

/// In-memory JSON-RPC node answering the calls the resolver makes.
#[derive(Default)]
pub struct ScriptedNode {
    pub incoming: Vec<Value>,
    pub outgoing: Vec<Value>,
    pub incoming_error: Option<RpcError>,
    pub outgoing_error: Option<RpcError>,
    pub txs: HashMap<String, Result<Value, RpcError>>,
    pub blocks: HashMap<String, Value>,
    pub balances: HashMap<String, Value>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a log to the matching query plus its transaction and block.
    pub fn transfer(mut self, incoming: bool, n: u64, amount: u128, block: u64, time_secs: u64) -> Self {
        let (from, to) = if incoming { (PEER, ACCOUNT) } else { (ACCOUNT, PEER) };
        let log = json!({
            "address": TOKEN_MAINNET,
            "transactionHash": hash(n),
            "data": format!("0x{:064x}", amount),
            "topics": [TRANSFER_TOPIC, topic(from), topic(to)],
        });
        if incoming {
            self.incoming.push(log);
        } else {
            self.outgoing.push(log);
        }
        let block_hex = format!("0x{:x}", block);
        self.txs.insert(hash(n), Ok(json!({ "hash": hash(n), "blockNumber": block_hex })));
        self.blocks.insert(block_hex, json!({ "timestamp": format!("0x{:x}", time_secs) }));
        self
    }

    pub fn failing_tx(mut self, n: u64, err: RpcError) -> Self {
        self.txs.insert(hash(n), Err(err));
        self
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|m| *m == method).count()
    }
}

#[async_trait]
impl RpcTransport for ScriptedNode {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        self.calls.lock().unwrap().push(method.to_string());
        match method {
            "eth_getLogs" => {
                let incoming = params[0]["topics"][1].is_null();
                let (logs, err) = if incoming {
                    (&self.incoming, &self.incoming_error)
                } else {
                    (&self.outgoing, &self.outgoing_error)
                };
                match err {
                    Some(e) => Err(e.clone()),
                    None => Ok(Value::Array(logs.clone())),
                }
            }
            "eth_getTransactionByHash" => {
                let hash = params[0].as_str().unwrap_or_default();
                self.txs.get(hash).cloned().unwrap_or(Ok(Value::Null))
            }
            "eth_getBlockByNumber" => {
                let number = params[0].as_str().unwrap_or_default();
                Ok(self.blocks.get(number).cloned().unwrap_or(Value::Null))
            }
            "eth_getBalance" => {
                let who = params[0].as_str().unwrap_or_default();
                Ok(self.balances.get(who).cloned().unwrap_or(json!("0x0")))
            }
            "eth_call" => {
                let to = params[0]["to"].as_str().unwrap_or_default();
                Ok(self.balances.get(to).cloned().unwrap_or(json!("0x")))
            }
            other => Err(RpcError::Protocol {
                code: -32601,
                message: format!("method {other} not found"),
            }),
        }
    }
}

pub fn mainnet_profile(rpc_url: &str) -> NetworkProfile {
    NetworkProfile::hemi_mainnet(rpc_url.to_string(), TOKEN_MAINNET.parse().unwrap())
}

pub fn testnet_profile(rpc_url: &str) -> NetworkProfile {
    NetworkProfile::hemi_testnet(rpc_url.to_string(), TOKEN_TESTNET.parse().unwrap())
}

pub fn mainnet_only(node: Arc<ScriptedNode>) -> Arc<Endpoints> {
    Arc::new(Endpoints::new().with(Network::Mainnet, mainnet_profile("memory://mainnet"), node))
}
