//! Server-rendered dashboard pages

use axum::{
    extract::{Path, Query, State},
    response::Html,
    routing::get,
    Router,
};
use handlebars::{Handlebars, TemplateError};
use serde_json::json;
use uuid::Uuid;

use estate_core::repositories::{FloorFilter, OwnerFilter, TenantFilter, UnitFilter};
use estate_core::services::CrudService;
use estate_shared::Pagination;

use crate::error::ApiResult;
use crate::state::AppState;

const PAGES: &[(&str, &str)] = &[
    ("index", include_str!("../templates/index.hbs")),
    ("buildings", include_str!("../templates/buildings.hbs")),
    ("floors", include_str!("../templates/floors.hbs")),
    ("units", include_str!("../templates/units.hbs")),
    ("unit", include_str!("../templates/unit.hbs")),
    ("owners", include_str!("../templates/owners.hbs")),
    ("tenants", include_str!("../templates/tenants.hbs")),
];

/// Compile the embedded page templates.
pub fn templates() -> Result<Handlebars<'static>, TemplateError> {
    let mut registry = Handlebars::new();
    registry.register_partial("layout", include_str!("../templates/layout.hbs"))?;
    for (name, source) in PAGES {
        registry.register_template_string(name, source)?;
    }
    Ok(registry)
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(summary))
        .route("/dashboard", get(summary))
        .route("/dashboard/buildings", get(buildings))
        .route("/dashboard/floors", get(floors))
        .route("/dashboard/units", get(units))
        .route("/dashboard/units/{id}", get(unit))
        .route("/dashboard/owners", get(owners))
        .route("/dashboard/tenants", get(tenants))
}

async fn summary(State(state): State<AppState>) -> ApiResult<Html<String>> {
    let summary = state.services.reports.summary().await?;
    let page = state
        .templates
        .render("index", &json!({ "title": "Summary", "summary": summary }))?;
    Ok(Html(page))
}

async fn buildings(State(state): State<AppState>) -> ApiResult<Html<String>> {
    let report = state.services.reports.occupancy(None).await?;
    let page = state
        .templates
        .render("buildings", &json!({ "title": "Buildings", "buildings": report.buildings }))?;
    Ok(Html(page))
}

async fn floors(
    State(state): State<AppState>,
    Query(filter): Query<FloorFilter>,
    Query(page): Query<Pagination>,
) -> ApiResult<Html<String>> {
    let floors = state.services.floors.list(&filter, page).await?;
    let page = state
        .templates
        .render("floors", &json!({ "title": "Floors", "floors": floors }))?;
    Ok(Html(page))
}

async fn units(
    State(state): State<AppState>,
    Query(filter): Query<UnitFilter>,
    Query(page): Query<Pagination>,
) -> ApiResult<Html<String>> {
    let units = state.services.units.list(&filter, page).await?;
    let page = state
        .templates
        .render("units", &json!({ "title": "Units", "units": units }))?;
    Ok(Html(page))
}

async fn unit(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Html<String>> {
    let details = state.services.units.details(id).await?;
    let title = format!("Unit {}", details.unit.unit_number);
    let page = state
        .templates
        .render("unit", &json!({ "title": title, "unit": details }))?;
    Ok(Html(page))
}

async fn owners(
    State(state): State<AppState>,
    Query(filter): Query<OwnerFilter>,
    Query(page): Query<Pagination>,
) -> ApiResult<Html<String>> {
    let owners = state.services.owners.list(&filter, page).await?;
    let page = state
        .templates
        .render("owners", &json!({ "title": "Owners", "owners": owners }))?;
    Ok(Html(page))
}

async fn tenants(
    State(state): State<AppState>,
    Query(filter): Query<TenantFilter>,
    Query(page): Query<Pagination>,
) -> ApiResult<Html<String>> {
    let tenants = state.services.tenants.list(&filter, page).await?;
    let page = state
        .templates
        .render("tenants", &json!({ "title": "Tenants", "tenants": tenants }))?;
    Ok(Html(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_compile_and_render() {
        let registry = templates().unwrap();
        let html = registry
            .render("owners", &json!({ "title": "Owners", "owners": [] }))
            .unwrap();
        assert!(html.contains("<h1>Owners</h1>"));
        assert!(html.contains("No owners yet."));
    }
}
