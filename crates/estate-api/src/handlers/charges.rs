//! Charge endpoints: payments, overdue refresh, statistics and monthly billing

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use estate_core::repositories::DateRange;
use estate_core::services::{ChargeService, ChargeStatistics, MonthlyBilling, PaymentReceipt};
use estate_core::{ChargeView, Payment, PaymentCreate};

use super::crud::crud_routes;
use super::BuildingScope;
use crate::error::ApiResult;
use crate::extract::Actor;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RefreshOverdueResponse {
    pub updated: usize,
}

pub fn routes() -> Router<AppState> {
    crud_routes::<ChargeService>()
        .route("/stats", get(stats))
        .route("/refresh-overdue", post(refresh_overdue))
        .route("/calculate-monthly", post(calculate_monthly))
        .route("/{id}/payments", get(payments).post(record_payment))
}

/// POST /api/v1/charges/{id}/payments
async fn record_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(input): Json<PaymentCreate>,
) -> ApiResult<(StatusCode, Json<PaymentReceipt>)> {
    let receipt = state
        .services
        .charges
        .record_payment(id, input, actor.as_str())
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// GET /api/v1/charges/{id}/payments
async fn payments(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Vec<Payment>>> {
    Ok(Json(state.services.charges.payments(id).await?))
}

/// POST /api/v1/charges/refresh-overdue
async fn refresh_overdue(
    State(state): State<AppState>,
    actor: Actor,
) -> ApiResult<Json<RefreshOverdueResponse>> {
    let updated = state
        .services
        .charges
        .refresh_overdue(Utc::now(), actor.as_str())
        .await?;
    Ok(Json(RefreshOverdueResponse { updated }))
}

/// POST /api/v1/charges/calculate-monthly?year=&month=&building_id=
async fn calculate_monthly(
    State(state): State<AppState>,
    actor: Actor,
    Query(billing): Query<MonthlyBilling>,
) -> ApiResult<(StatusCode, Json<Vec<ChargeView>>)> {
    let charges = state
        .services
        .charges
        .generate_monthly(billing, actor.as_str())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(charges.into_iter().map(ChargeView::from).collect()),
    ))
}

/// GET /api/v1/charges/stats?building_id=&start_date=&end_date=
async fn stats(
    State(state): State<AppState>,
    Query(scope): Query<BuildingScope>,
    Query(range): Query<DateRange>,
) -> ApiResult<Json<ChargeStatistics>> {
    Ok(Json(state.services.charges.statistics(scope.building_id, range).await?))
}
