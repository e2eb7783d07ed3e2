//! In-memory repositories for tests (feature `test-utils`).

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use estate_shared::Pagination;

use crate::domain::{
    Building, Charge, Cost, Entity, EntityFilter, Floor, Fund, FundTransaction, Owner, Payment,
    Tenant, Transaction, Unit,
};
use crate::error::DomainError;
use crate::repositories::{
    BuildingFilter, ChargeFilter, ChargeRepository, CostFilter, DateRange, FloorFilter,
    FundFilter, FundRepository, HealthCheck, OwnerFilter, Repositories, Repository, TenantFilter,
    TransactionFilter, UnitFilter,
};

/// Rows kept in insertion order; `L` is the ledger side table, if any.
pub struct MemoryRepository<T, F, L = ()> {
    rows: RwLock<Vec<T>>,
    ledger: RwLock<Vec<L>>,
    _filter: PhantomData<fn() -> F>,
}

impl<T, F, L> Default for MemoryRepository<T, F, L> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            ledger: RwLock::new(Vec::new()),
            _filter: PhantomData,
        }
    }
}

impl<T, F, L> MemoryRepository<T, F, L> {
    pub fn new() -> Self {
        Self::default()
    }
}

fn page<T: Clone>(rows: impl Iterator<Item = T>, page: Pagination) -> Vec<T> {
    rows.skip(page.skip as usize).take(page.limit as usize).collect()
}

#[async_trait]
impl<T, F, L> Repository<T, F> for MemoryRepository<T, F, L>
where
    T: Entity,
    F: EntityFilter<T>,
    L: Send + Sync + 'static,
{
    async fn find_by_id(&self, id: Uuid) -> Result<Option<T>, DomainError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().find(|row| row.id() == id).cloned())
    }

    async fn list(&self, filter: &F, pagination: Pagination) -> Result<Vec<T>, DomainError> {
        let rows = self.rows.read().await;
        Ok(page(
            rows.iter()
                .rev()
                .filter(|row| !row.is_deleted() && filter.matches(row))
                .cloned(),
            pagination,
        ))
    }

    async fn list_deleted(&self, pagination: Pagination) -> Result<Vec<T>, DomainError> {
        let rows = self.rows.read().await;
        Ok(page(
            rows.iter().rev().filter(|row| row.is_deleted()).cloned(),
            pagination,
        ))
    }

    async fn count(&self, include_deleted: bool) -> Result<i64, DomainError> {
        let rows = self.rows.read().await;
        let count = rows
            .iter()
            .filter(|row| include_deleted || !row.is_deleted())
            .count();
        Ok(count as i64)
    }

    async fn create(&self, entity: &T) -> Result<T, DomainError> {
        let mut rows = self.rows.write().await;
        if rows.iter().any(|row| row.id() == entity.id()) {
            return Err(DomainError::already_exists(T::KIND, "id", entity.id()));
        }
        rows.push(entity.clone());
        Ok(entity.clone())
    }

    async fn update(&self, entity: &T) -> Result<T, DomainError> {
        let mut rows = self.rows.write().await;
        let slot = rows
            .iter_mut()
            .find(|row| row.id() == entity.id())
            .ok_or_else(|| DomainError::not_found(T::KIND, entity.id()))?;
        *slot = entity.clone();
        Ok(entity.clone())
    }

    async fn hard_delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|row| row.id() != id);
        Ok(rows.len() != before)
    }
}

#[async_trait]
impl ChargeRepository for MemoryRepository<Charge, ChargeFilter, Payment> {
    async fn record_payment(
        &self,
        charge: &Charge,
        previous_paid: Decimal,
        payment: &Payment,
    ) -> Result<Charge, DomainError> {
        let mut rows = self.rows.write().await;
        let mut ledger = self.ledger.write().await;
        let slot = rows
            .iter_mut()
            .find(|row| row.id == charge.id)
            .ok_or_else(|| DomainError::not_found(Charge::KIND, charge.id))?;
        if slot.amount_paid != previous_paid {
            return Err(DomainError::Conflict(format!(
                "Charge {} was paid concurrently",
                charge.id
            )));
        }
        *slot = charge.clone();
        ledger.push(payment.clone());
        Ok(charge.clone())
    }

    async fn list_payments(&self, charge_id: Uuid) -> Result<Vec<Payment>, DomainError> {
        let ledger = self.ledger.read().await;
        let mut payments: Vec<Payment> = ledger
            .iter()
            .filter(|p| p.charge_id == charge_id)
            .cloned()
            .collect();
        payments.sort_by_key(|p| p.payment_date);
        Ok(payments)
    }
}

#[async_trait]
impl FundRepository for MemoryRepository<Fund, FundFilter, FundTransaction> {
    async fn save_transaction(
        &self,
        fund: &Fund,
        previous_balance: Decimal,
        tx: &FundTransaction,
    ) -> Result<(Fund, FundTransaction), DomainError> {
        let mut rows = self.rows.write().await;
        let mut ledger = self.ledger.write().await;
        let slot = rows
            .iter_mut()
            .find(|row| row.id == fund.id)
            .ok_or_else(|| DomainError::not_found(Fund::KIND, fund.id))?;
        if slot.current_balance != previous_balance {
            return Err(DomainError::Conflict(format!(
                "Fund {} balance changed concurrently",
                fund.id
            )));
        }
        *slot = fund.clone();
        match ledger.iter_mut().find(|row| row.id == tx.id) {
            Some(existing) => *existing = tx.clone(),
            None => ledger.push(tx.clone()),
        }
        Ok((fund.clone(), tx.clone()))
    }

    async fn find_transaction(
        &self,
        fund_id: Uuid,
        tx_id: Uuid,
    ) -> Result<Option<FundTransaction>, DomainError> {
        let ledger = self.ledger.read().await;
        Ok(ledger
            .iter()
            .find(|tx| tx.fund_id == fund_id && tx.id == tx_id)
            .cloned())
    }

    async fn list_transactions(
        &self,
        fund_id: Uuid,
        range: &DateRange,
    ) -> Result<Vec<FundTransaction>, DomainError> {
        let ledger = self.ledger.read().await;
        let mut rows: Vec<FundTransaction> = ledger
            .iter()
            .filter(|tx| tx.fund_id == fund_id && range.contains(tx.transaction_date))
            .cloned()
            .collect();
        rows.sort_by_key(|tx| tx.transaction_date);
        Ok(rows)
    }
}

/// Health probe whose answer tests can flip.
#[derive(Debug)]
pub struct MemoryHealth {
    healthy: AtomicBool,
}

impl Default for MemoryHealth {
    fn default() -> Self {
        Self {
            healthy: AtomicBool::new(true),
        }
    }
}

impl MemoryHealth {
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }
}

#[async_trait]
impl HealthCheck for MemoryHealth {
    async fn ping(&self) -> Result<(), DomainError> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DomainError::DatabaseError("database unavailable".into()))
        }
    }
}

/// A full set of empty in-memory repositories.
pub fn repositories() -> Repositories {
    Repositories {
        buildings: Arc::new(MemoryRepository::<Building, BuildingFilter>::new()),
        floors: Arc::new(MemoryRepository::<Floor, FloorFilter>::new()),
        units: Arc::new(MemoryRepository::<Unit, UnitFilter>::new()),
        owners: Arc::new(MemoryRepository::<Owner, OwnerFilter>::new()),
        tenants: Arc::new(MemoryRepository::<Tenant, TenantFilter>::new()),
        charges: Arc::new(MemoryRepository::<Charge, ChargeFilter, Payment>::new()),
        costs: Arc::new(MemoryRepository::<Cost, CostFilter>::new()),
        funds: Arc::new(MemoryRepository::<Fund, FundFilter, FundTransaction>::new()),
        transactions: Arc::new(MemoryRepository::<Transaction, TransactionFilter>::new()),
        health: Arc::new(MemoryHealth::default()),
    }
}
