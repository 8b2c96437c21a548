// src/network.rs
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, str::FromStr, sync::Arc, time::Duration};
use tracing::debug;

use crate::error::RpcError;
use crate::rate_limiter::RateLimiter;
use crate::rpc::{HttpTransport, RateLimitedTransport, RpcTransport};

pub const HEMI_MAINNET_RPC: &str = "https://rpc.hemi.network/rpc";
pub const HEMI_TESTNET_RPC: &str = "https://testnet.rpc.hemi.network/rpc";

/// $HAIR token contracts
pub const TOKEN_MAINNET: &str = "0x5B774f563C902FA7b203FB7029ed6eD4Ce274705";
pub const TOKEN_TESTNET: &str = "0xa6Af91a69eee1E35887D5F229FA69f61021B36F3";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub const ALL: [Network; 2] = [Network::Mainnet, Network::Testnet];

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            other => Err(format!("unknown network '{other}' (expected mainnet or testnet)")),
        }
    }
}

impl TryFrom<String> for Network {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Static description of one chain the token lives on.
#[derive(Debug, Clone)]
pub struct NetworkProfile {
    pub chain_name: String,
    pub chain_id: u64,
    pub rpc_url: String,
    pub token_address: Address,
    pub explorer_url: String,
}

impl NetworkProfile {
    pub fn hemi_mainnet(rpc_url: String, token_address: Address) -> Self {
        Self {
            chain_name: "Hemi Network".to_string(),
            chain_id: 43111,
            rpc_url,
            token_address,
            explorer_url: "https://explorer.hemi.xyz/".to_string(),
        }
    }

    pub fn hemi_testnet(rpc_url: String, token_address: Address) -> Self {
        Self {
            chain_name: "Hemi Sepolia".to_string(),
            chain_id: 743111,
            rpc_url,
            token_address,
            explorer_url: "https://testnet.explorer.hemi.xyz/".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Networks {
    pub mainnet: NetworkProfile,
    pub testnet: NetworkProfile,
}

impl Networks {
    pub fn get(&self, network: Network) -> &NetworkProfile {
        match network {
            Network::Mainnet => &self.mainnet,
            Network::Testnet => &self.testnet,
        }
    }
}

/// A network profile paired with the transport used to reach it.
#[derive(Clone)]
pub struct NetworkClient {
    pub profile: NetworkProfile,
    pub rpc: Arc<dyn RpcTransport>,
}

/// Per-network transports shared by the resolver, balances and the API.
#[derive(Clone, Default)]
pub struct Endpoints {
    clients: HashMap<Network, NetworkClient>,
}

impl Endpoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, network: Network, profile: NetworkProfile, rpc: Arc<dyn RpcTransport>) -> Self {
        self.clients.insert(network, NetworkClient { profile, rpc });
        self
    }

    /// HTTP transports for both profiles, all gated by the same limiter.
    pub fn from_networks(networks: &Networks, limiter: Arc<RateLimiter>, timeout: Duration) -> Result<Self, RpcError> {
        let mut endpoints = Self::new();
        for network in Network::ALL {
            let profile = networks.get(network).clone();
            let http = HttpTransport::new(profile.rpc_url.clone(), timeout)?;
            debug!("{} ({}, chain {}) via {}", network, profile.chain_name, profile.chain_id, http.url());
            let rpc: Arc<dyn RpcTransport> = Arc::new(RateLimitedTransport::new(http, Arc::clone(&limiter)));
            endpoints = endpoints.with(network, profile, rpc);
        }
        Ok(endpoints)
    }

    pub fn get(&self, network: Network) -> Result<&NetworkClient, RpcError> {
        self.clients.get(&network).ok_or(RpcError::Unconfigured(network))
    }
}
