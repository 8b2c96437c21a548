use alloy::primitives::Address;
use dotenvy::dotenv;
use eyre::{Result, WrapErr};
use std::{env, str::FromStr, time::Duration};
use tracing::info;

use crate::network::{
    NetworkProfile, Networks, HEMI_MAINNET_RPC, HEMI_TESTNET_RPC, TOKEN_MAINNET, TOKEN_TESTNET,
};
use crate::rate_limiter::{DEFAULT_CAPACITY, DEFAULT_WINDOW};
use crate::resolver::DEFAULT_HISTORY_LIMIT;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub networks: Networks,
    pub rate_limit_capacity: usize,
    pub rate_limit_window: Duration,
    pub request_timeout: Duration,
    pub history_limit: usize,
}

/// Numeric setting with a fallback for missing or unparsable values.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_address(key: &str, default: &str) -> Result<Address> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<Address>()
        .wrap_err_with(|| format!("{key} is not a valid address: {raw}"))
}

pub fn load() -> Result<Config> {
    dotenv().ok();

    // VITE_* aliases let the front-end's .env be reused as is
    let mainnet_rpc = env::var("HEMI_MAINNET_RPC")
        .or_else(|_| env::var("VITE_HEMI_MAINNET_RPC"))
        .unwrap_or_else(|_| HEMI_MAINNET_RPC.to_string());
    let testnet_rpc = env::var("HEMI_TESTNET_RPC")
        .or_else(|_| env::var("VITE_HEMI_TESTNET_RPC"))
        .unwrap_or_else(|_| HEMI_TESTNET_RPC.to_string());

    let networks = Networks {
        mainnet: NetworkProfile::hemi_mainnet(mainnet_rpc, env_address("TOKEN_MAINNET", TOKEN_MAINNET)?),
        testnet: NetworkProfile::hemi_testnet(testnet_rpc, env_address("TOKEN_TESTNET", TOKEN_TESTNET)?),
    };

    let cfg = Config {
        port: env_or("PORT", 8080),
        networks,
        rate_limit_capacity: env_or("RATE_LIMIT_MAX_REQUESTS", DEFAULT_CAPACITY),
        rate_limit_window: Duration::from_millis(env_or(
            "RATE_LIMIT_WINDOW_MS",
            DEFAULT_WINDOW.as_millis() as u64,
        )),
        request_timeout: Duration::from_secs(env_or("RPC_TIMEOUT_SECS", 10)),
        history_limit: env_or("HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT),
    };

    info!("Loaded config: {:?}", cfg);

    Ok(cfg)
}
