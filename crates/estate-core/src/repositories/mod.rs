//! Repository traits (ports)

pub mod filters;

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use estate_shared::Pagination;

use crate::domain::{
    Building, Charge, Cost, Entity, EntityFilter, Floor, Fund, FundTransaction, Owner, Payment,
    Tenant, Transaction, Unit,
};
use crate::error::DomainError;

pub use filters::{
    BuildingFilter, ChargeFilter, CostFilter, DateRange, FloorFilter, FundFilter, OwnerFilter,
    TenantFilter, TransactionFilter, UnitFilter,
};

/// Persistence port shared by every resource.
///
/// `find_by_id` returns soft-deleted rows too; `list` returns only live rows,
/// newest first. Soft delete and restore are plain `update`s of the audit block.
#[async_trait]
pub trait Repository<T, F>: Send + Sync
where
    T: Entity,
    F: EntityFilter<T>,
{
    async fn find_by_id(&self, id: Uuid) -> Result<Option<T>, DomainError>;
    async fn list(&self, filter: &F, page: Pagination) -> Result<Vec<T>, DomainError>;
    async fn list_deleted(&self, page: Pagination) -> Result<Vec<T>, DomainError>;
    async fn count(&self, include_deleted: bool) -> Result<i64, DomainError>;
    async fn create(&self, entity: &T) -> Result<T, DomainError>;
    async fn update(&self, entity: &T) -> Result<T, DomainError>;
    /// Returns `false` when no row had that id.
    async fn hard_delete(&self, id: Uuid) -> Result<bool, DomainError>;
}

pub type BuildingRepository = dyn Repository<Building, BuildingFilter>;
pub type FloorRepository = dyn Repository<Floor, FloorFilter>;
pub type UnitRepository = dyn Repository<Unit, UnitFilter>;
pub type OwnerRepository = dyn Repository<Owner, OwnerFilter>;
pub type TenantRepository = dyn Repository<Tenant, TenantFilter>;
pub type CostRepository = dyn Repository<Cost, CostFilter>;
pub type TransactionRepository = dyn Repository<Transaction, TransactionFilter>;

/// Charges plus their payment ledger.
#[async_trait]
pub trait ChargeRepository: Repository<Charge, ChargeFilter> {
    /// Persist `charge` and append `payment` atomically. Fails with
    /// `Conflict` when the stored `amount_paid` no longer equals
    /// `previous_paid`.
    async fn record_payment(
        &self,
        charge: &Charge,
        previous_paid: Decimal,
        payment: &Payment,
    ) -> Result<Charge, DomainError>;

    async fn list_payments(&self, charge_id: Uuid) -> Result<Vec<Payment>, DomainError>;
}

/// Funds plus their transaction ledger.
#[async_trait]
pub trait FundRepository: Repository<Fund, FundFilter> {
    /// Persist `fund` and insert-or-update `tx` atomically. Fails with
    /// `Conflict` when the stored balance no longer equals
    /// `previous_balance`.
    async fn save_transaction(
        &self,
        fund: &Fund,
        previous_balance: Decimal,
        tx: &FundTransaction,
    ) -> Result<(Fund, FundTransaction), DomainError>;

    async fn find_transaction(
        &self,
        fund_id: Uuid,
        tx_id: Uuid,
    ) -> Result<Option<FundTransaction>, DomainError>;

    /// Ledger rows of a fund ordered by `transaction_date` ascending.
    async fn list_transactions(
        &self,
        fund_id: Uuid,
        range: &DateRange,
    ) -> Result<Vec<FundTransaction>, DomainError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> Result<(), DomainError>;
}

/// Every repository the services need, as trait objects.
#[derive(Clone)]
pub struct Repositories {
    pub buildings: Arc<BuildingRepository>,
    pub floors: Arc<FloorRepository>,
    pub units: Arc<UnitRepository>,
    pub owners: Arc<OwnerRepository>,
    pub tenants: Arc<TenantRepository>,
    pub charges: Arc<dyn ChargeRepository>,
    pub costs: Arc<CostRepository>,
    pub funds: Arc<dyn FundRepository>,
    pub transactions: Arc<TransactionRepository>,
    pub health: Arc<dyn HealthCheck>,
}
