//! Cross-resource reports

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use estate_core::repositories::DateRange;
use estate_core::services::{DebtorsReport, IncomeExpensesReport, OccupancyReport};

use super::OptionalBuildingScope;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/occupancy", get(occupancy))
        .route("/debtors", get(debtors))
        .route("/income-expenses", get(income_expenses))
}

/// GET /api/v1/reports/occupancy?building_id=
async fn occupancy(
    State(state): State<AppState>,
    Query(scope): Query<OptionalBuildingScope>,
) -> ApiResult<Json<OccupancyReport>> {
    Ok(Json(state.services.reports.occupancy(scope.building_id).await?))
}

/// GET /api/v1/reports/debtors?building_id=
async fn debtors(
    State(state): State<AppState>,
    Query(scope): Query<OptionalBuildingScope>,
) -> ApiResult<Json<DebtorsReport>> {
    Ok(Json(state.services.reports.debtors(scope.building_id).await?))
}

/// GET /api/v1/reports/income-expenses?start_date=&end_date=&building_id=
async fn income_expenses(
    State(state): State<AppState>,
    Query(range): Query<DateRange>,
    Query(scope): Query<OptionalBuildingScope>,
) -> ApiResult<Json<IncomeExpensesReport>> {
    let report = state
        .services
        .reports
        .income_expenses(range, scope.building_id)
        .await?;
    Ok(Json(report))
}
