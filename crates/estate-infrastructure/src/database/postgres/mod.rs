//! PostgreSQL repository implementations

mod record;
mod filters;
mod repository;
mod records;
mod charge_repo_impl;
mod fund_repo_impl;
mod health;

use std::sync::Arc;

use sqlx::PgPool;

use estate_core::domain::{Building, Cost, Floor, Owner, Tenant, Transaction, Unit};
use estate_core::repositories::{
    BuildingFilter, CostFilter, FloorFilter, OwnerFilter, Repositories, TenantFilter,
    TransactionFilter, UnitFilter,
};

pub use charge_repo_impl::PgChargeRepository;
pub use filters::SqlFilter;
pub use fund_repo_impl::PgFundRepository;
pub use health::PgHealthCheck;
pub use record::PgRecord;
pub use repository::PgRepository;

/// Builds the full repository set over one pool.
pub fn pg_repositories(pool: PgPool) -> Repositories {
    Repositories {
        buildings: Arc::new(PgRepository::<Building, BuildingFilter>::new(pool.clone())),
        floors: Arc::new(PgRepository::<Floor, FloorFilter>::new(pool.clone())),
        units: Arc::new(PgRepository::<Unit, UnitFilter>::new(pool.clone())),
        owners: Arc::new(PgRepository::<Owner, OwnerFilter>::new(pool.clone())),
        tenants: Arc::new(PgRepository::<Tenant, TenantFilter>::new(pool.clone())),
        charges: Arc::new(PgChargeRepository::new(pool.clone())),
        costs: Arc::new(PgRepository::<Cost, CostFilter>::new(pool.clone())),
        funds: Arc::new(PgFundRepository::new(pool.clone())),
        transactions: Arc::new(PgRepository::<Transaction, TransactionFilter>::new(
            pool.clone(),
        )),
        health: Arc::new(PgHealthCheck::new(pool)),
    }
}
