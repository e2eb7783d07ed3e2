//! Cost endpoints

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use estate_core::repositories::DateRange;
use estate_core::services::{CostService, CostStatistics};
use estate_core::{CostCompletion, CostView};

use super::crud::crud_routes;
use super::BuildingScope;
use crate::error::ApiResult;
use crate::extract::Actor;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    crud_routes::<CostService>()
        .route("/stats", get(stats))
        .route("/{id}/complete", post(complete))
}

/// POST /api/v1/costs/{id}/complete
async fn complete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(completion): Json<CostCompletion>,
) -> ApiResult<Json<CostView>> {
    let cost = state
        .services
        .costs
        .complete(id, completion, actor.as_str())
        .await?;
    Ok(Json(cost.into()))
}

/// GET /api/v1/costs/stats?building_id=&start_date=&end_date=
async fn stats(
    State(state): State<AppState>,
    Query(scope): Query<BuildingScope>,
    Query(range): Query<DateRange>,
) -> ApiResult<Json<CostStatistics>> {
    Ok(Json(state.services.costs.statistics(scope.building_id, range).await?))
}
