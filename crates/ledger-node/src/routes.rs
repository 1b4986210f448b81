//! HTTP surface over the ledger. Handlers only translate; all rules live in `ledger-core`.

use crate::constants::API_NAME;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ledger_core::{
    BlockView, CancelToken, ClientInfo, Ledger, LedgerError, MinedBlock, TamperReport,
    Transaction, ValidationReport,
};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub mine_timeout: Duration,
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    data: T,
}

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    Ledger(LedgerError),
    Internal(String),
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        Self::Ledger(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Ledger(LedgerError::BlockNotFound(_)) => StatusCode::NOT_FOUND,
            Self::Ledger(LedgerError::DuplicateName(_)) => StatusCode::CONFLICT,
            Self::Ledger(LedgerError::MiningCancelled)
            | Self::Ledger(LedgerError::NonceSpaceExhausted { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Ledger(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            Self::Ledger(e) => e.to_string(),
            Self::Internal(msg) => msg,
        };
        (
            status,
            Json(serde_json::json!({ "success": false, "error": error })),
        )
            .into_response()
    }
}

#[derive(Serialize)]
struct Info {
    name: &'static str,
    version: &'static str,
    status: &'static str,
}

#[derive(Deserialize)]
pub struct ClientCreate {
    name: String,
}

#[derive(Deserialize)]
pub struct TransactionCreate {
    sender: String,
    recipient: String,
    value: f64,
}

#[derive(Deserialize)]
pub struct MineRequest {
    #[serde(default)]
    difficulty: Option<u32>,
}

#[derive(Serialize)]
struct Message {
    message: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/",
            get(|| async {
                Json(Info {
                    name: API_NAME,
                    version: env!("CARGO_PKG_VERSION"),
                    status: "running",
                })
            }),
        )
        .route("/health", get(|| async { ok("ok") }))
        .route("/api/clients", get(list_clients).post(create_client))
        .route("/api/transactions", post(create_transaction))
        .route("/api/transactions/pending", get(list_pending))
        .route("/api/mine", post(mine))
        .route("/api/blockchain", get(get_chain))
        .route("/api/validate", get(validate))
        .route("/api/tamper/{block_number}", post(tamper))
        .route("/api/reset", post(reset))
        .with_state(state)
}

async fn create_client(
    State(state): State<AppState>,
    Json(body): Json<ClientCreate>,
) -> ApiResult<ClientInfo> {
    Ok(ok(state.ledger.create_client(&body.name)?))
}

async fn list_clients(State(state): State<AppState>) -> Json<ApiResponse<Vec<ClientInfo>>> {
    ok(state.ledger.list_clients())
}

async fn create_transaction(
    State(state): State<AppState>,
    Json(body): Json<TransactionCreate>,
) -> ApiResult<Transaction> {
    let tx = state
        .ledger
        .submit_transaction(&body.sender, &body.recipient, body.value)?;
    Ok(ok(tx))
}

async fn list_pending(State(state): State<AppState>) -> Json<ApiResponse<Vec<Transaction>>> {
    ok(state.ledger.list_pending())
}

/// Runs the nonce search on the blocking pool and cancels it once
/// `mine_timeout` elapses. The reply always reflects what the search actually
/// did: a block found while the cancel was in flight is still reported.
async fn mine(State(state): State<AppState>, Json(body): Json<MineRequest>) -> ApiResult<MinedBlock> {
    let difficulty = body
        .difficulty
        .unwrap_or(state.ledger.config().default_difficulty);
    let cancel = CancelToken::new();
    let mut task = {
        let ledger = Arc::clone(&state.ledger);
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || ledger.mine_with_cancel(difficulty, &cancel))
    };
    let joined = match tokio::time::timeout(state.mine_timeout, &mut task).await {
        Ok(joined) => joined,
        Err(_) => {
            warn!(difficulty, timeout = ?state.mine_timeout, "mine request timed out");
            cancel.cancel();
            task.await
        }
    };
    let mined = joined.map_err(|e| ApiError::Internal(e.to_string()))??;
    Ok(ok(mined))
}

async fn get_chain(State(state): State<AppState>) -> Json<ApiResponse<Vec<BlockView>>> {
    ok(state.ledger.get_chain())
}

async fn validate(State(state): State<AppState>) -> Json<ApiResponse<ValidationReport>> {
    ok(state.ledger.validate())
}

async fn tamper(
    State(state): State<AppState>,
    Path(block_number): Path<u64>,
) -> ApiResult<TamperReport> {
    Ok(ok(state.ledger.tamper(block_number)?))
}

async fn reset(State(state): State<AppState>) -> ApiResult<Message> {
    let ledger = Arc::clone(&state.ledger);
    // reset waits for an in-flight mine
    tokio::task::spawn_blocking(move || ledger.reset())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(ok(Message {
        message: "Blockchain reset successfully".to_string(),
    }))
}
