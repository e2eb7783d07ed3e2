use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use estate_core::services::{UnitDetails, UnitService};

use super::crud::crud_routes;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    crud_routes::<UnitService>().route("/{id}/details", get(details))
}

/// GET /api/v1/units/{id}/details
async fn details(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<UnitDetails>> {
    Ok(Json(state.services.units.details(id).await?))
}
