mod common;

use common::*;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use token_account::rpc::RateLimitedTransport;
use token_account::{Endpoints, Network, RateLimiter, RpcError, TransactionResolver, TransferKind, TxStatus};

fn resolver(node: &Arc<ScriptedNode>) -> TransactionResolver {
    TransactionResolver::new(mainnet_only(Arc::clone(node)))
}

#[tokio::test]
async fn logs_are_tagged_by_the_query_that_returned_them() {
    let node = Arc::new(
        ScriptedNode::new()
            .transfer(true, 1, ONE_TOKEN, 100, 1_700_000_000)
            .transfer(false, 2, ONE_TOKEN / 2, 101, 1_700_000_100),
    );

    let history = resolver(&node)
        .fetch_transactions(account(), Network::Mainnet)
        .await
        .unwrap();

    assert_eq!(history.dropped, 0);
    assert_eq!(history.transactions.len(), 2);

    let sent = &history.transactions[0];
    assert_eq!(sent.kind, TransferKind::Sent);
    assert_eq!(sent.from, ACCOUNT);
    assert_eq!(sent.to, PEER);
    assert_eq!(sent.value, "0.5");
    assert_eq!(sent.block_number, 101);

    let received = &history.transactions[1];
    assert_eq!(received.kind, TransferKind::Received);
    assert_eq!(received.from, PEER);
    assert_eq!(received.to, ACCOUNT);
    assert_eq!(received.value, "1");
    assert_eq!(received.status, TxStatus::Success);
    assert_eq!(received.timestamp, 1_700_000_000_000);
    assert_eq!(received.date, "2023-11-14T22:13:20.000Z");
    assert_eq!(received.hash, hash(1));
}

#[tokio::test]
async fn returns_the_twenty_most_recent_newest_first() {
    let mut node = ScriptedNode::new();
    for n in 0..25u64 {
        // interleave directions and shuffle times so node order is not chronological
        let time = 1_600_000_000 + ((n * 7) % 25) * 60;
        node = node.transfer(n % 2 == 0, n, ONE_TOKEN, 1_000 + n, time);
    }
    let node = Arc::new(node);

    let history = resolver(&node)
        .fetch_transactions(account(), Network::Mainnet)
        .await
        .unwrap();

    assert_eq!(history.transactions.len(), 20);
    assert!(history
        .transactions
        .windows(2)
        .all(|w| w[0].timestamp > w[1].timestamp));

    // the 5 oldest (offsets 0..5 minutes) are cut
    let oldest_kept = history.transactions.last().unwrap().timestamp;
    assert_eq!(oldest_kept, (1_600_000_000 + 5 * 60) * 1000);
    assert_eq!(history.transactions[0].timestamp, (1_600_000_000 + 24 * 60) * 1000);
}

#[tokio::test]
async fn a_failing_lookup_only_drops_that_log() {
    let mut node = ScriptedNode::new();
    for n in 1..=5u64 {
        node = node.transfer(true, n, ONE_TOKEN * n as u128, 10 + n, 1_650_000_000 + n);
    }
    let node = Arc::new(node.failing_tx(3, RpcError::Transport("connection reset".into())));

    let history = resolver(&node)
        .fetch_transactions(account(), Network::Mainnet)
        .await
        .unwrap();

    let hashes: Vec<_> = history.transactions.iter().map(|t| t.hash.clone()).collect();
    assert_eq!(hashes, vec![hash(5), hash(4), hash(2), hash(1)]);
    assert_eq!(history.dropped, 1);
    assert_eq!(history.errors.len(), 1);
    assert!(history.errors[0].contains("connection reset"));
}

#[tokio::test]
async fn incoming_query_error_aborts_before_any_lookup() {
    let mut node = ScriptedNode::new().transfer(false, 1, ONE_TOKEN, 1, 1_700_000_000);
    node.incoming_error = Some(RpcError::Protocol {
        code: -32005,
        message: "query returned more than 10000 results".into(),
    });
    let node = Arc::new(node);

    let err = resolver(&node)
        .fetch_transactions(account(), Network::Mainnet)
        .await
        .unwrap_err();

    match err {
        RpcError::Protocol { message, .. } => assert!(message.contains("10000")),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(node.count("eth_getTransactionByHash"), 0);
    assert_eq!(node.count("eth_getBlockByNumber"), 0);
}

#[tokio::test]
async fn outgoing_query_error_is_fatal_too() {
    let mut node = ScriptedNode::new().transfer(true, 1, ONE_TOKEN, 1, 1_700_000_000);
    node.outgoing_error = Some(RpcError::Transport("HTTP 503 Service Unavailable".into()));
    let node = Arc::new(node);

    let res = resolver(&node).fetch_transactions(account(), Network::Mainnet).await;

    assert!(matches!(res, Err(RpcError::Transport(_))));
    assert_eq!(node.count("eth_getTransactionByHash"), 0);
}

#[tokio::test]
async fn no_logs_is_an_empty_history() {
    let node = Arc::new(ScriptedNode::new());

    let history = resolver(&node)
        .fetch_transactions(account(), Network::Mainnet)
        .await
        .unwrap();

    assert!(history.is_empty());
    assert_eq!(history.dropped, 0);
    assert_eq!(node.count("eth_getLogs"), 2);
}

#[tokio::test]
async fn pending_and_malformed_logs_are_dropped() {
    let mut node = ScriptedNode::new()
        .transfer(true, 1, ONE_TOKEN, 5, 1_700_000_000)
        .transfer(true, 2, ONE_TOKEN, 6, 1_700_000_500);
    // pending: no block number yet
    node.txs.insert(hash(2), Ok(serde_json::json!({ "hash": hash(2), "blockNumber": null })));
    // truncated hash never reaches the node
    node.incoming.push(serde_json::json!({
        "transactionHash": "0xdeadbeef",
        "data": "0x01",
        "topics": [token_account::rpc::TRANSFER_TOPIC, topic(PEER), topic(ACCOUNT)],
    }));
    let node = Arc::new(node);

    let history = resolver(&node)
        .fetch_transactions(account(), Network::Mainnet)
        .await
        .unwrap();

    assert_eq!(history.transactions.len(), 1);
    assert_eq!(history.transactions[0].hash, hash(1));
    assert_eq!(history.dropped, 2);
    assert_eq!(node.count("eth_getTransactionByHash"), 2);
}

#[tokio::test]
async fn missing_block_drops_the_log() {
    let mut node = ScriptedNode::new().transfer(false, 9, ONE_TOKEN, 77, 1_700_000_000);
    node.blocks.clear();
    let node = Arc::new(node);

    let history = resolver(&node)
        .fetch_transactions(account(), Network::Mainnet)
        .await
        .unwrap();

    assert!(history.is_empty());
    assert_eq!(history.dropped, 1);
    assert!(history.errors[0].contains("not found"));
}

#[tokio::test]
async fn custom_limit_truncates_history() {
    let node = Arc::new(
        ScriptedNode::new()
            .transfer(true, 1, ONE_TOKEN, 1, 1_700_000_001)
            .transfer(true, 2, ONE_TOKEN, 2, 1_700_000_002)
            .transfer(true, 3, ONE_TOKEN, 3, 1_700_000_003),
    );

    let history = resolver(&node)
        .with_limit(2)
        .fetch_transactions(account(), Network::Mainnet)
        .await
        .unwrap();

    let hashes: Vec<_> = history.transactions.iter().map(|t| t.hash.clone()).collect();
    assert_eq!(hashes, vec![hash(3), hash(2)]);
}

#[tokio::test]
async fn unconfigured_network_is_rejected() {
    let node = Arc::new(ScriptedNode::new());

    let res = resolver(&node).fetch_transactions(account(), Network::Testnet).await;

    assert!(matches!(res, Err(RpcError::Unconfigured(Network::Testnet))));
    assert_eq!(node.count("eth_getLogs"), 0);
}

#[tokio::test]
async fn cancelled_fetch_returns_cancelled() {
    let node = Arc::new(ScriptedNode::new().transfer(true, 1, ONE_TOKEN, 1, 1_700_000_000));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let res = resolver(&node)
        .fetch_transactions_until(account(), Network::Mainnet, &cancel)
        .await;

    assert!(matches!(res, Err(RpcError::Cancelled)));
}

#[tokio::test(start_paused = true)]
async fn every_call_goes_through_the_rate_limiter() {
    let node = Arc::new(
        ScriptedNode::new()
            .transfer(true, 1, ONE_TOKEN, 1, 1_700_000_000)
            .transfer(false, 2, ONE_TOKEN, 2, 1_700_000_001),
    );
    let limiter = Arc::new(RateLimiter::new(2, Duration::from_secs(1)));
    let gated = RateLimitedTransport::new(Arc::clone(&node), Arc::clone(&limiter));
    let endpoints = Arc::new(Endpoints::new().with(
        Network::Mainnet,
        mainnet_profile("memory://mainnet"),
        Arc::new(gated),
    ));

    let start = tokio::time::Instant::now();
    let history = TransactionResolver::new(endpoints)
        .fetch_transactions(account(), Network::Mainnet)
        .await
        .unwrap();

    // 2 log queries + 2 × (tx + block) = 6 calls at 2 per second
    assert_eq!(history.transactions.len(), 2);
    assert_eq!(node.calls.lock().unwrap().len(), 6);
    assert!(start.elapsed() >= Duration::from_secs(2));
}

#[tokio::test]
async fn structurally_broken_log_entries_are_dropped_individually() {
    let mut node = ScriptedNode::new().transfer(true, 1, ONE_TOKEN, 5, 1_700_000_000);
    node.incoming.push(serde_json::json!({
        "transactionHash": null,
        "data": "0x01",
        "topics": [token_account::rpc::TRANSFER_TOPIC, topic(PEER), topic(ACCOUNT)],
    }));
    node.outgoing.push(serde_json::json!({ "transactionHash": hash(2), "data": 7 }));
    let node = Arc::new(node);

    let history = resolver(&node)
        .fetch_transactions(account(), Network::Mainnet)
        .await
        .unwrap();

    assert_eq!(history.transactions.len(), 1);
    assert_eq!(history.transactions[0].hash, hash(1));
    assert_eq!(history.dropped, 2);
    assert!(history.errors.iter().any(|e| e.starts_with("<no hash>")));
    assert!(history.errors.iter().any(|e| e.starts_with(&hash(2))));
    // neither broken entry reached the node
    assert_eq!(node.count("eth_getTransactionByHash"), 1);
}
