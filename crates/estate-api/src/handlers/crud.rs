//! Generic CRUD endpoints shared by every resource
//!
//! Each resource service is a [`CrudService`]; [`Resource`] adds the
//! response shape and how to find the service in [`AppState`].

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use estate_core::services::{
    BuildingService, ChargeService, CostService, CrudService, FloorService, FundService,
    OwnerService, TenantService, TransactionService, UnitService,
};
use estate_core::{ChargeView, CostView, Entity, FundView};
use estate_shared::Pagination;

use crate::error::ApiResult;
use crate::extract::Actor;
use crate::state::AppState;

pub trait Resource: CrudService {
    /// JSON shape of one record.
    type View: Serialize + From<Self::Entity> + Send + 'static;

    fn service(state: &AppState) -> &Arc<Self>;
}

macro_rules! resource {
    ($service:ty, $view:ty, $field:ident) => {
        impl Resource for $service {
            type View = $view;

            fn service(state: &AppState) -> &Arc<Self> {
                &state.services.$field
            }
        }
    };
}

resource!(BuildingService, estate_core::Building, buildings);
resource!(FloorService, estate_core::Floor, floors);
resource!(UnitService, estate_core::Unit, units);
resource!(OwnerService, estate_core::Owner, owners);
resource!(TenantService, estate_core::Tenant, tenants);
resource!(ChargeService, ChargeView, charges);
resource!(CostService, CostView, costs);
resource!(FundService, FundView, funds);
resource!(TransactionService, estate_core::Transaction, transactions);

/// Body of a permanent delete.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub status: &'static str,
    pub message: String,
}

/// List, create, get, update, soft delete, restore and purge for `R`.
pub fn crud_routes<R: Resource>() -> Router<AppState> {
    Router::new()
        .route("/", get(list::<R>).post(create::<R>))
        .route("/deleted", get(list_deleted::<R>))
        .route("/{id}", get(get_one::<R>).put(update::<R>).delete(soft_delete::<R>))
        .route("/{id}/restore", post(restore::<R>))
        .route("/{id}/permanent", delete(hard_delete::<R>))
}

pub(crate) fn views<R: Resource>(items: Vec<R::Entity>) -> Vec<R::View> {
    items.into_iter().map(R::View::from).collect()
}

async fn list<R: Resource>(
    State(state): State<AppState>,
    Query(filter): Query<R::Filter>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<R::View>>> {
    let items = R::service(&state).list(&filter, page).await?;
    Ok(Json(views::<R>(items)))
}

async fn list_deleted<R: Resource>(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<R::View>>> {
    let items = R::service(&state).list_deleted(page).await?;
    Ok(Json(views::<R>(items)))
}

async fn create<R: Resource>(
    State(state): State<AppState>,
    actor: Actor,
    Json(input): Json<R::Create>,
) -> ApiResult<(StatusCode, Json<R::View>)> {
    let created = R::service(&state).create(input, actor.as_str()).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

async fn get_one<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<R::View>> {
    let entity = R::service(&state).get(id).await?;
    Ok(Json(entity.into()))
}

async fn update<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(changes): Json<R::Update>,
) -> ApiResult<Json<R::View>> {
    let updated = R::service(&state).update(id, changes, actor.as_str()).await?;
    Ok(Json(updated.into()))
}

async fn soft_delete<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> ApiResult<Json<R::View>> {
    let deleted = R::service(&state).soft_delete(id, actor.as_str()).await?;
    Ok(Json(deleted.into()))
}

async fn restore<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> ApiResult<Json<R::View>> {
    let restored = R::service(&state).restore(id, actor.as_str()).await?;
    Ok(Json(restored.into()))
}

async fn hard_delete<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeleteResponse>> {
    R::service(&state).hard_delete(id).await?;
    Ok(Json(DeleteResponse {
        status: "success",
        message: format!("{} {} permanently deleted", <R::Entity as Entity>::KIND, id),
    }))
}
