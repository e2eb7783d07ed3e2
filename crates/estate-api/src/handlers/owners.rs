use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use estate_core::services::{OwnerDetails, OwnerService};

use super::crud::crud_routes;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    crud_routes::<OwnerService>().route("/{id}/details", get(details))
}

/// GET /api/v1/owners/{id}/details
async fn details(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<OwnerDetails>> {
    Ok(Json(state.services.owners.details(id).await?))
}
