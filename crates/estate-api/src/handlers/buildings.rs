use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use estate_core::services::{BuildingService, BuildingStats};
use estate_core::Floor;
use estate_shared::Pagination;

use super::crud::crud_routes;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    crud_routes::<BuildingService>()
        .route("/stats", get(stats))
        .route("/{id}/floors", get(floors))
}

/// GET /api/v1/buildings/stats
async fn stats(State(state): State<AppState>) -> ApiResult<Json<BuildingStats>> {
    Ok(Json(state.services.buildings.stats().await?))
}

/// GET /api/v1/buildings/{id}/floors
async fn floors(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<Floor>>> {
    Ok(Json(state.services.buildings.floors(id, page).await?))
}
