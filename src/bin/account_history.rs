use alloy::primitives::Address;
use anyhow::Context;
use std::sync::Arc;

use token_account::network::{NetworkProfile, HEMI_MAINNET_RPC, HEMI_TESTNET_RPC, TOKEN_MAINNET, TOKEN_TESTNET};
use token_account::rpc::{HttpTransport, RateLimitedTransport, RpcTransport};
use token_account::{Endpoints, Network, RateLimiter, TransactionResolver};

/// Usage: account_history <address> [mainnet|testnet]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let account: Address = args
        .next()
        .context("usage: account_history <address> [mainnet|testnet]")?
        .parse()
        .context("invalid address")?;
    let network: Network = match args.next() {
        Some(s) => s.parse().map_err(anyhow::Error::msg)?,
        None => Network::Mainnet,
    };

    let profile = match network {
        Network::Mainnet => NetworkProfile::hemi_mainnet(HEMI_MAINNET_RPC.to_string(), TOKEN_MAINNET.parse()?),
        Network::Testnet => NetworkProfile::hemi_testnet(HEMI_TESTNET_RPC.to_string(), TOKEN_TESTNET.parse()?),
    };
    let token = profile.token_address;

    let limiter = Arc::new(RateLimiter::default());
    let http = HttpTransport::new(profile.rpc_url.clone(), std::time::Duration::from_secs(10))?;
    let rpc: Arc<dyn RpcTransport> = Arc::new(RateLimitedTransport::new(http, Arc::clone(&limiter)));
    let endpoints = Arc::new(Endpoints::new().with(network, profile, rpc));

    println!("Fetching {} transfers for {} on {}...", token, account, network);

    let history = TransactionResolver::new(endpoints)
        .fetch_transactions(account, network)
        .await?;

    if history.is_empty() {
        println!("No transactions found");
    }
    for tx in &history.transactions {
        println!(
            "{} | {:?} | {} → {} | {} | {}",
            tx.date, tx.kind, tx.from, tx.to, tx.value, tx.hash
        );
    }
    if history.dropped > 0 {
        println!("{} log(s) could not be resolved:", history.dropped);
        for err in &history.errors {
            println!("  {}", err);
        }
    }

    let stats = limiter.stats();
    println!("Rate limit: {} remaining, reset in {} ms", stats.remaining, stats.time_until_reset_ms);

    Ok(())
}
