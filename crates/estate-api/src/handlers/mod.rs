//! HTTP handlers, one module per resource

pub mod crud;
pub mod health;

pub mod buildings;
pub mod floors;
pub mod units;
pub mod owners;
pub mod tenants;
pub mod charges;
pub mod costs;
pub mod funds;
pub mod transactions;
pub mod reports;

use serde::Deserialize;
use uuid::Uuid;

/// `?building_id=` for statistics endpoints scoped to one building.
#[derive(Debug, Deserialize)]
pub struct BuildingScope {
    pub building_id: Uuid,
}

/// `?building_id=` where the scope is optional.
#[derive(Debug, Default, Deserialize)]
pub struct OptionalBuildingScope {
    pub building_id: Option<Uuid>,
}
