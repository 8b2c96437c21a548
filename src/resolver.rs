// src/resolver.rs
//! Rebuilds an account's $HAIR transfer history from `Transfer` logs.
//!
//! Two bulk `eth_getLogs` queries (incoming and outgoing) must both succeed.
//! Each returned log is then resolved on its own: transaction lookup, block
//! lookup, decode. A log that fails any of those steps is dropped and noted in
//! the returned [`History`]; it never fails the whole fetch.

use alloy::primitives::Address;
use futures_util::future::{join_all, try_join};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::RpcError;
use crate::models::{History, Transaction, TransferKind, TxStatus};
use crate::network::{Endpoints, Network};
use crate::parser::{self, Direction, TaggedLog, TOKEN_DECIMALS};
use crate::rpc::{self, Log, RpcTransport, TransferFilter};

pub const DEFAULT_HISTORY_LIMIT: usize = 20;

pub struct TransactionResolver {
    endpoints: Arc<Endpoints>,
    limit: usize,
}

impl TransactionResolver {
    pub fn new(endpoints: Arc<Endpoints>) -> Self {
        Self {
            endpoints,
            limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Up to `limit` most recent transfers, newest first.
    pub async fn fetch_transactions(&self, account: Address, network: Network) -> Result<History, RpcError> {
        self.fetch_transactions_until(account, network, &CancellationToken::new())
            .await
    }

    /// Same as [`fetch_transactions`](Self::fetch_transactions), abandoning all
    /// outstanding calls once `cancel` fires.
    pub async fn fetch_transactions_until(
        &self,
        account: Address,
        network: Network,
        cancel: &CancellationToken,
    ) -> Result<History, RpcError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("History fetch for {} on {} cancelled", account, network);
                Err(RpcError::Cancelled)
            }
            res = self.resolve(account, network) => res,
        }
    }

    async fn resolve(&self, account: Address, network: Network) -> Result<History, RpcError> {
        let client = self.endpoints.get(network)?;
        let rpc = client.rpc.as_ref();
        let token = parser::format_address(&client.profile.token_address);
        let account_topic = parser::address_to_topic(&account);

        info!("Fetching {} transfers for {} on {}", token, account, network);

        let incoming = TransferFilter::new(token.clone(), None, Some(account_topic.clone()));
        let outgoing = TransferFilter::new(token, Some(account_topic), None);

        let (incoming, outgoing) =
            try_join(rpc::get_logs(rpc, &incoming), rpc::get_logs(rpc, &outgoing)).await?;

        debug!("{} incoming / {} outgoing logs", incoming.len(), outgoing.len());

        let raw: Vec<(Value, Direction)> = incoming
            .into_iter()
            .map(|log| (log, Direction::Incoming))
            .chain(outgoing.into_iter().map(|log| (log, Direction::Outgoing)))
            .collect();

        let results = join_all(
            raw.iter()
                .map(|(log, direction)| resolve_log(rpc, log, *direction, &account)),
        )
        .await;

        let mut history = History::default();
        for ((log, _), result) in raw.iter().zip(results) {
            match result {
                Ok(tx) => history.transactions.push(tx),
                Err(e) => {
                    let label = log["transactionHash"].as_str().unwrap_or("<no hash>");
                    warn!("Skipping log {}: {}", label, e);
                    history.dropped += 1;
                    history.errors.push(format!("{}: {}", label, e));
                }
            }
        }

        // newest first
        history
            .transactions
            .sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        history.transactions.truncate(self.limit);

        info!(
            "Resolved {} transfers for {} on {} ({} dropped)",
            history.transactions.len(),
            account,
            network,
            history.dropped
        );

        Ok(history)
    }
}

async fn resolve_log(
    rpc: &dyn RpcTransport,
    raw: &Value,
    direction: Direction,
    account: &Address,
) -> Result<Transaction, RpcError> {
    let log: Log = serde_json::from_value(raw.clone())?;
    let tagged = TaggedLog { log, direction };
    let log = &tagged.log;
    parser::validate_tx_hash(&log.tx_hash)?;

    let amount = parser::decode_amount(&log.data)?;
    let (from, to) = parser::counterparties(&tagged, account)?;

    let tx = rpc::get_transaction_by_hash(rpc, &log.tx_hash).await?;
    let block_tag = tx
        .block_number
        .ok_or_else(|| RpcError::NotFound(format!("block number of {}", tx.hash)))?;
    let block = rpc::get_block_by_number(rpc, &block_tag).await?;

    let timestamp = parser::block_time_millis(&block.timestamp)?;

    Ok(Transaction {
        hash: log.tx_hash.clone(),
        from: parser::format_address(&from),
        to: parser::format_address(&to),
        value: parser::format_units(amount, TOKEN_DECIMALS),
        timestamp,
        block_number: parser::parse_quantity(&block_tag)?,
        kind: match tagged.direction {
            Direction::Incoming => TransferKind::Received,
            Direction::Outgoing => TransferKind::Sent,
        },
        status: TxStatus::Success,
        date: parser::iso_date(timestamp)?,
    })
}
