use alloy::primitives::Address;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{info, warn};

use crate::balances;
use crate::config::Config;
use crate::error::{RpcError, TransferError};
use crate::models::{Balances, History};
use crate::network::{Endpoints, Network};
use crate::rate_limiter::{RateLimitStats, RateLimiter};
use crate::resolver::TransactionResolver;
use crate::transfer::{self, TransferRequest};

#[derive(Clone)]
pub struct AppState {
    pub endpoints: Arc<Endpoints>,
    pub resolver: Arc<TransactionResolver>,
    pub limiter: Arc<RateLimiter>,
}

#[derive(Deserialize)]
pub struct TransactionsQuery {
    pub address: String,
    pub network: Option<Network>, // defaults to mainnet
}

#[derive(Deserialize)]
pub struct BalancesQuery {
    pub address: String,
}

#[derive(Deserialize)]
pub struct PrepareTransferBody {
    pub from: String,
    pub recipient: String,
    pub amount: String,
    pub network: Option<Network>,
}

pub enum ApiError {
    BadRequest(String),
    Upstream(String),
}

impl From<RpcError> for ApiError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Unconfigured(_) => ApiError::BadRequest(err.to_string()),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<TransferError> for ApiError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::Rpc(e) => e.into(),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

// axum's own rejections are plain text; keep every 400 in the JSON shape
impl From<QueryRejection> for ApiError {
    fn from(rej: QueryRejection) -> Self {
        ApiError::BadRequest(rej.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rej: JsonRejection) -> Self {
        ApiError::BadRequest(rej.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Upstream(m) => (StatusCode::BAD_GATEWAY, m),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn parse_account(raw: &str) -> Result<Address, ApiError> {
    transfer::validate_recipient(raw).map_err(|_| ApiError::BadRequest(format!("invalid address: {raw}")))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(|| async { "Token account API running" }))
        .route("/transactions", get(get_transactions))
        .route("/balances", get(get_balances))
        .route("/rate-limit", get(get_rate_limit))
        .route("/transfer/prepare", post(prepare_transfer))
        .with_state(state)
        .layer(cors)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
}

pub async fn serve(cfg: Config, state: AppState) -> eyre::Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], cfg.port));
    info!("API listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state).into_make_service()).await?;

    Ok(())
}

// ---------- handlers ----------

async fn get_transactions(
    State(state): State<AppState>,
    q: Result<Query<TransactionsQuery>, QueryRejection>,
) -> Result<Json<History>, ApiError> {
    let Query(q) = q?;
    let account = parse_account(&q.address)?;
    let network = q.network.unwrap_or(Network::Mainnet);

    let history = state
        .resolver
        .fetch_transactions(account, network)
        .await
        .map_err(|e| {
            warn!("History fetch failed for {} on {}: {}", account, network, e);
            ApiError::from(e)
        })?;

    Ok(Json(history))
}

async fn get_balances(
    State(state): State<AppState>,
    q: Result<Query<BalancesQuery>, QueryRejection>,
) -> Result<Json<Balances>, ApiError> {
    let Query(q) = q?;
    let account = parse_account(&q.address)?;
    Ok(Json(balances::fetch_balances(&state.endpoints, &account).await))
}

async fn get_rate_limit(State(state): State<AppState>) -> Json<RateLimitStats> {
    Json(state.limiter.stats())
}

async fn prepare_transfer(
    State(state): State<AppState>,
    body: Result<Json<PrepareTransferBody>, JsonRejection>,
) -> Result<Json<TransferRequest>, ApiError> {
    let Json(body) = body?;
    let from = parse_account(&body.from)?;
    let network = body.network.unwrap_or(Network::Mainnet);
    let client = state.endpoints.get(network)?;

    let request = transfer::prepare_transfer(&from, &client.profile.token_address, &body.recipient, &body.amount)?;
    Ok(Json(request))
}
