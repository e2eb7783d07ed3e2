//! Tenant endpoints and lease extension

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use uuid::Uuid;

use estate_core::services::{LeaseExtension, TenantService};
use estate_core::Tenant;

use super::crud::crud_routes;
use crate::error::ApiResult;
use crate::extract::Actor;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    crud_routes::<TenantService>().route("/{id}/extend-lease", post(extend_lease))
}

/// POST /api/v1/tenants/{id}/extend-lease
async fn extend_lease(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(extension): Json<LeaseExtension>,
) -> ApiResult<Json<Tenant>> {
    let tenant = state
        .services
        .tenants
        .extend_lease(id, extension, actor.as_str())
        .await?;
    Ok(Json(tenant))
}
