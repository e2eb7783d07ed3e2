use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use estate_core::repositories::DateRange;
use estate_core::services::{TransactionService, TransactionStatistics};

use super::crud::crud_routes;
use super::BuildingScope;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    crud_routes::<TransactionService>().route("/stats", get(stats))
}

/// GET /api/v1/transactions/stats?building_id=&start_date=&end_date=
async fn stats(
    State(state): State<AppState>,
    Query(scope): Query<BuildingScope>,
    Query(range): Query<DateRange>,
) -> ApiResult<Json<TransactionStatistics>> {
    let stats = state
        .services
        .transactions
        .statistics(scope.building_id, range)
        .await?;
    Ok(Json(stats))
}
