use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use estate_core::services::{FloorService, FloorStats};

use super::crud::crud_routes;
use super::BuildingScope;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    crud_routes::<FloorService>().route("/stats", get(stats))
}

/// GET /api/v1/floors/stats?building_id=
async fn stats(
    State(state): State<AppState>,
    Query(scope): Query<BuildingScope>,
) -> ApiResult<Json<Vec<FloorStats>>> {
    Ok(Json(state.services.floors.stats(scope.building_id).await?))
}
