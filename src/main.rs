use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use token_account::{api, config, Endpoints, Network, RateLimiter, TransactionResolver};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stdout)
        .with_target(false)
        .init();

    info!("Token account service starting...");

    let cfg = config::load()?;
    for network in Network::ALL {
        let profile = cfg.networks.get(network);
        info!(
            "  {} : {} (chain {}) rpc={} explorer={}",
            network, profile.chain_name, profile.chain_id, profile.rpc_url, profile.explorer_url
        );
    }
    info!("  Port: {}", cfg.port);
    info!(
        "  Rate limit: {} requests / {:?}",
        cfg.rate_limit_capacity, cfg.rate_limit_window
    );

    // one limiter for every outbound RPC call
    let limiter = Arc::new(RateLimiter::new(cfg.rate_limit_capacity, cfg.rate_limit_window));
    let endpoints = Arc::new(Endpoints::from_networks(
        &cfg.networks,
        Arc::clone(&limiter),
        cfg.request_timeout,
    )?);
    let resolver = Arc::new(TransactionResolver::new(Arc::clone(&endpoints)).with_limit(cfg.history_limit));

    let state = api::AppState {
        endpoints,
        resolver,
        limiter,
    };

    let api_handle = tokio::spawn({
        let cfg = cfg.clone();
        async move { api::serve(cfg, state).await }
    });

    tokio::select! {
        res = api_handle => match res {
            Ok(Ok(_)) => info!("API exited cleanly"),
            Ok(Err(e)) => error!("API error: {:?}", e),
            Err(e) => error!("API task panicked: {:?}", e),
        },
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received, stopping...");
        }
    }

    info!("Token account service stopped.");
    Ok(())
}
