//! Cash register (PDV) endpoints.
//!
//! ```text
//! POST /cash/sessions                     open with a float
//! GET  /cash/sessions/current?operator=   open session + running summary
//! POST /cash/sessions/{id}/transactions   sale / withdrawal / deposit
//! POST /cash/sessions/{id}/close          counted cash ──► variance
//! ```

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use entrega_core::cash::NewCashTransaction;
use entrega_core::{CashRegisterSession, CashTransaction, Money, Reconciliation, SessionSummary};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Creates the cash register routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cash/sessions", get(list_sessions).post(open_session))
        .route("/cash/sessions/current", get(current_session))
        .route("/cash/sessions/{id}", get(get_session))
        .route(
            "/cash/sessions/{id}/transactions",
            get(list_transactions).post(record_transaction),
        )
        .route("/cash/sessions/{id}/close", post(close_session))
}

#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    pub operator: String,
    pub opening_float: Money,
}

/// A session with its running totals.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: CashRegisterSession,
    pub summary: SessionSummary,
}

/// POST `/cash/sessions` - Open a session.
async fn open_session(
    State(state): State<AppState>,
    Json(req): Json<OpenSessionRequest>,
) -> ApiResult<(StatusCode, Json<CashRegisterSession>)> {
    let session = state
        .db
        .cash_register()
        .open_session(&req.operator, req.opening_float)
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

#[derive(Debug, Deserialize)]
pub struct ListSessionsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    30
}

/// GET `/cash/sessions` - Recent sessions, newest first.
async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<ListSessionsQuery>,
) -> ApiResult<Json<Vec<CashRegisterSession>>> {
    Ok(Json(state.db.cash_register().list_sessions(query.limit).await?))
}

#[derive(Debug, Deserialize)]
pub struct CurrentSessionQuery {
    pub operator: String,
}

/// GET `/cash/sessions/current?operator=` - The operator's open session.
async fn current_session(
    State(state): State<AppState>,
    Query(query): Query<CurrentSessionQuery>,
) -> ApiResult<Json<SessionResponse>> {
    let repo = state.db.cash_register();
    let session = repo
        .current_session(query.operator.trim())
        .await?
        .ok_or_else(|| ApiError::not_found("Open cash register session for", &query.operator))?;

    let (session, summary) = repo.summary(&session.id).await?;
    Ok(Json(SessionResponse { session, summary }))
}

/// GET `/cash/sessions/{id}`
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionResponse>> {
    let (session, summary) = state.db.cash_register().summary(&id).await?;
    Ok(Json(SessionResponse { session, summary }))
}

/// GET `/cash/sessions/{id}/transactions` - The ledger, oldest first.
async fn list_transactions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<CashTransaction>>> {
    let repo = state.db.cash_register();
    if repo.get_session(&id).await?.is_none() {
        return Err(ApiError::not_found("Cash register session", &id));
    }
    Ok(Json(repo.list_transactions(&id).await?))
}

/// POST `/cash/sessions/{id}/transactions`
async fn record_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(new): Json<NewCashTransaction>,
) -> ApiResult<(StatusCode, Json<CashTransaction>)> {
    let transaction = state.db.cash_register().record_transaction(&id, &new).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

#[derive(Debug, Deserialize)]
pub struct CloseSessionRequest {
    pub counted_cash: Money,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CloseSessionResponse {
    pub session: CashRegisterSession,
    pub reconciliation: Reconciliation,
}

/// POST `/cash/sessions/{id}/close` - Reconcile and close.
async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CloseSessionRequest>,
) -> ApiResult<Json<CloseSessionResponse>> {
    let (session, reconciliation) = state
        .db
        .cash_register()
        .close_session(&id, req.counted_cash, req.notes.as_deref())
        .await?;
    Ok(Json(CloseSessionResponse {
        session,
        reconciliation,
    }))
}
