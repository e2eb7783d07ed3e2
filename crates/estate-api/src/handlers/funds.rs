//! Fund endpoints: transaction ledger, approvals and monthly reports

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use estate_core::repositories::DateRange;
use estate_core::services::{FundMonthlyReport, FundService, FundStatistics, FundTransactionReceipt};
use estate_core::{FundTransaction, FundTransactionCreate};

use super::crud::crud_routes;
use super::BuildingScope;
use crate::error::ApiResult;
use crate::extract::Actor;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReportPeriod {
    pub year: i32,
    pub month: u32,
}

pub fn routes() -> Router<AppState> {
    crud_routes::<FundService>()
        .route("/stats", get(stats))
        .route("/{id}/transactions", get(transactions).post(record_transaction))
        .route("/{id}/transactions/{tx_id}/approve", post(approve_transaction))
        .route("/{id}/report", get(monthly_report))
}

/// POST /api/v1/funds/{id}/transactions
async fn record_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(input): Json<FundTransactionCreate>,
) -> ApiResult<(StatusCode, Json<FundTransactionReceipt>)> {
    let receipt = state
        .services
        .funds
        .record_transaction(id, input, actor.as_str())
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// GET /api/v1/funds/{id}/transactions?start_date=&end_date=
async fn transactions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(range): Query<DateRange>,
) -> ApiResult<Json<Vec<FundTransaction>>> {
    Ok(Json(state.services.funds.transactions(id, range).await?))
}

/// POST /api/v1/funds/{id}/transactions/{tx_id}/approve
async fn approve_transaction(
    State(state): State<AppState>,
    Path((id, tx_id)): Path<(Uuid, Uuid)>,
    actor: Actor,
) -> ApiResult<Json<FundTransactionReceipt>> {
    let receipt = state
        .services
        .funds
        .approve_transaction(id, tx_id, actor.as_str())
        .await?;
    Ok(Json(receipt))
}

/// GET /api/v1/funds/{id}/report?year=&month=
async fn monthly_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(period): Query<ReportPeriod>,
) -> ApiResult<Json<FundMonthlyReport>> {
    let report = state
        .services
        .funds
        .monthly_report(id, period.year, period.month)
        .await?;
    Ok(Json(report))
}

/// GET /api/v1/funds/stats?building_id=
async fn stats(
    State(state): State<AppState>,
    Query(scope): Query<BuildingScope>,
) -> ApiResult<Json<FundStatistics>> {
    Ok(Json(state.services.funds.statistics(scope.building_id).await?))
}
