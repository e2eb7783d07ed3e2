//! Fund service: balances, ledger writes, approvals and reports

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::crud::{require_active, Crud, CrudService};
use super::{month_bounds, Totals};
use crate::domain::money::round2;
use crate::domain::{
    Entity, Fund, FundCreate, FundTransaction, FundTransactionCreate, FundTransactionStatus,
    FundUpdate, FundView,
};
use crate::error::DomainError;
use crate::repositories::{
    BuildingRepository, ChargeRepository, CostRepository, DateRange, FundFilter, FundRepository,
    Repository,
};

/// Result of a ledger write: the fund after it and the transaction row.
#[derive(Debug, Clone, Serialize)]
pub struct FundTransactionReceipt {
    pub fund: FundView,
    pub transaction: FundTransaction,
}

#[derive(Debug, Clone, Serialize)]
pub struct FundMonthlyReport {
    pub fund_id: Uuid,
    pub fund_name: String,
    pub year: i32,
    pub month: u32,
    pub opening_balance: Decimal,
    pub closing_balance: Decimal,
    pub total_inflow: Decimal,
    pub total_outflow: Decimal,
    pub transactions: Vec<FundTransaction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FundStatistics {
    pub building_id: Uuid,
    pub total_funds: i64,
    pub total_balance: Decimal,
    pub total_available: Decimal,
    pub total_target: Decimal,
    pub low_balance_count: i64,
    pub pending_approvals: i64,
    /// Balances per fund type.
    pub by_type: BTreeMap<String, Totals>,
    pub by_status: BTreeMap<String, i64>,
}

pub struct FundService {
    crud: Crud<Fund, FundFilter, dyn FundRepository>,
    buildings: Arc<BuildingRepository>,
    costs: Arc<CostRepository>,
    charges: Arc<dyn ChargeRepository>,
}

impl FundService {
    pub fn new(
        funds: Arc<dyn FundRepository>,
        buildings: Arc<BuildingRepository>,
        costs: Arc<CostRepository>,
        charges: Arc<dyn ChargeRepository>,
    ) -> Self {
        Self {
            crud: Crud::new(funds),
            buildings,
            costs,
            charges,
        }
    }

    async fn ensure_name_free(
        &self,
        building_id: Uuid,
        name: &str,
        except: Option<Uuid>,
    ) -> Result<(), DomainError> {
        let filter = FundFilter {
            building_id: Some(building_id),
            name: Some(name.to_string()),
            ..Default::default()
        };
        let taken = self
            .crud
            .all(&filter)
            .await?
            .into_iter()
            .any(|f| Some(f.id) != except);
        if taken {
            warn!("Fund '{}' already exists in building {}", name, building_id);
            return Err(DomainError::already_exists("Fund", "name", name));
        }
        Ok(())
    }

    async fn save(
        &self,
        fund: &Fund,
        previous_balance: Decimal,
        tx: &FundTransaction,
    ) -> Result<FundTransactionReceipt, DomainError> {
        let (fund, transaction) = self
            .crud
            .repo()
            .save_transaction(fund, previous_balance, tx)
            .await?;
        Ok(FundTransactionReceipt {
            fund: fund.into(),
            transaction,
        })
    }

    pub async fn record_transaction(
        &self,
        fund_id: Uuid,
        input: FundTransactionCreate,
        actor: &str,
    ) -> Result<FundTransactionReceipt, DomainError> {
        let mut fund = self.crud.get(fund_id).await?;
        if let Some(cost_id) = input.cost_id {
            require_active(self.costs.as_ref(), cost_id).await?;
        }
        if let Some(charge_id) = input.charge_id {
            match self.charges.find_by_id(charge_id).await? {
                Some(charge) if !charge.is_deleted() => {}
                _ => return Err(DomainError::not_found("Charge", charge_id)),
            }
        }

        let previous_balance = fund.current_balance;
        let tx = fund.record_transaction(input, actor).inspect_err(|e| {
            warn!("Transaction on fund {} rejected: {}", fund_id, e);
        })?;
        let receipt = self.save(&fund, previous_balance, &tx).await?;
        info!(
            "Fund {} {} of {} recorded as {} (balance {})",
            fund_id, tx.transaction_type, tx.amount, tx.status, receipt.fund.fund.current_balance
        );
        Ok(receipt)
    }

    pub async fn approve_transaction(
        &self,
        fund_id: Uuid,
        tx_id: Uuid,
        actor: &str,
    ) -> Result<FundTransactionReceipt, DomainError> {
        let mut fund = self.crud.get(fund_id).await?;
        let mut tx = self
            .crud
            .repo()
            .find_transaction(fund_id, tx_id)
            .await?
            .ok_or_else(|| DomainError::not_found("FundTransaction", tx_id))?;

        let previous_balance = fund.current_balance;
        fund.approve_transaction(&mut tx, actor).inspect_err(|e| {
            warn!("Approval of fund transaction {} rejected: {}", tx_id, e);
        })?;
        let receipt = self.save(&fund, previous_balance, &tx).await?;
        info!("Fund transaction {} approved by {}", tx_id, actor);
        Ok(receipt)
    }

    pub async fn transactions(
        &self,
        fund_id: Uuid,
        range: DateRange,
    ) -> Result<Vec<FundTransaction>, DomainError> {
        self.crud.get(fund_id).await?;
        self.crud.repo().list_transactions(fund_id, &range).await
    }

    /// Opening/closing balance and completed movements of one calendar month.
    pub async fn monthly_report(
        &self,
        fund_id: Uuid,
        year: i32,
        month: u32,
    ) -> Result<FundMonthlyReport, DomainError> {
        let fund = self.crud.get(fund_id).await?;
        let (start, end) = month_bounds(year, month)?;

        let since_start: Vec<FundTransaction> = self
            .crud
            .repo()
            .list_transactions(fund_id, &DateRange::new(Some(start), None))
            .await?
            .into_iter()
            .filter(|tx| tx.status == FundTransactionStatus::Completed)
            .collect();

        let signed = |tx: &FundTransaction| tx.transaction_type.signed(tx.amount);
        let moved_since_start: Decimal = since_start.iter().map(signed).sum();
        let moved_since_end: Decimal = since_start
            .iter()
            .filter(|tx| tx.transaction_date >= end)
            .map(signed)
            .sum();

        let transactions: Vec<FundTransaction> = since_start
            .into_iter()
            .filter(|tx| tx.transaction_date < end)
            .collect();
        let total_inflow: Decimal = transactions
            .iter()
            .map(signed)
            .filter(|d| *d > Decimal::ZERO)
            .sum();
        let total_outflow: Decimal = transactions
            .iter()
            .map(signed)
            .filter(|d| *d < Decimal::ZERO)
            .map(|d| -d)
            .sum();

        Ok(FundMonthlyReport {
            fund_id,
            fund_name: fund.name.clone(),
            year,
            month,
            opening_balance: round2(fund.current_balance - moved_since_start),
            closing_balance: round2(fund.current_balance - moved_since_end),
            total_inflow: round2(total_inflow),
            total_outflow: round2(total_outflow),
            transactions,
        })
    }

    pub async fn statistics(&self, building_id: Uuid) -> Result<FundStatistics, DomainError> {
        require_active(self.buildings.as_ref(), building_id).await?;
        let funds = self
            .crud
            .all(&FundFilter {
                building_id: Some(building_id),
                ..Default::default()
            })
            .await?;

        let mut stats = FundStatistics {
            building_id,
            total_funds: funds.len() as i64,
            total_balance: Decimal::ZERO,
            total_available: Decimal::ZERO,
            total_target: Decimal::ZERO,
            low_balance_count: 0,
            pending_approvals: 0,
            by_type: BTreeMap::new(),
            by_status: BTreeMap::new(),
        };
        for fund in &funds {
            stats.total_balance += fund.current_balance;
            stats.total_available += fund.available_balance();
            stats.total_target += fund.target_amount.unwrap_or_default();
            if fund.is_low_balance() {
                stats.low_balance_count += 1;
            }
            stats.pending_approvals += self
                .crud
                .repo()
                .list_transactions(fund.id, &DateRange::default())
                .await?
                .iter()
                .filter(|tx| tx.status == FundTransactionStatus::Pending)
                .count() as i64;
            stats
                .by_type
                .entry(fund.fund_type.to_string())
                .or_default()
                .add(fund.current_balance);
            *stats.by_status.entry(fund.status.to_string()).or_default() += 1;
        }
        stats.total_balance = round2(stats.total_balance);
        stats.total_available = round2(stats.total_available);
        stats.total_target = round2(stats.total_target);
        Ok(stats)
    }
}

#[async_trait]
impl CrudService for FundService {
    type Entity = Fund;
    type Filter = FundFilter;
    type Create = FundCreate;
    type Update = FundUpdate;
    type Repo = dyn FundRepository;

    fn crud(&self) -> &Crud<Fund, FundFilter, dyn FundRepository> {
        &self.crud
    }

    async fn create(&self, input: FundCreate, actor: &str) -> Result<Fund, DomainError> {
        let fund = Fund::new(input, actor)?;
        require_active(self.buildings.as_ref(), fund.building_id).await?;
        self.ensure_name_free(fund.building_id, &fund.name, None)
            .await?;
        self.crud.insert(fund).await
    }

    async fn update(&self, id: Uuid, changes: FundUpdate, actor: &str) -> Result<Fund, DomainError> {
        let mut fund = self.crud.get(id).await?;
        if let Some(name) = changes
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.eq_ignore_ascii_case(&fund.name))
        {
            self.ensure_name_free(fund.building_id, name, Some(id)).await?;
        }
        fund.apply(changes, actor)?;
        self.crud.save(&fund).await
    }

    /// A fund still holding money cannot be deleted.
    async fn soft_delete(&self, id: Uuid, actor: &str) -> Result<Fund, DomainError> {
        let fund = self.crud.get_any(id).await?;
        if !fund.audit.is_deleted {
            fund.ensure_empty().inspect_err(|_| {
                warn!("Fund {} cannot be deleted with a non-zero balance", id);
            })?;
        }
        self.crud.soft_delete_entity(fund, actor).await
    }

    async fn restore(&self, id: Uuid, actor: &str) -> Result<Fund, DomainError> {
        let fund = self.crud.deleted(id).await?;
        require_active(self.buildings.as_ref(), fund.building_id).await?;
        self.ensure_name_free(fund.building_id, &fund.name, Some(id))
            .await?;
        self.crud.restore_entity(fund, actor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Building, BuildingCreate, FundStatus, FundTransactionType, FundType, PaymentMethod,
    };
    use crate::memory::repositories;
    use crate::repositories::{Repositories, Repository};
    use chrono::{Datelike, Duration, Utc};
    use rust_decimal_macros::dec;

    async fn setup() -> (Repositories, FundService, Building) {
        let repos = repositories();
        let building = Building::new(
            BuildingCreate {
                name: "Garden Court".into(),
                address: None,
                total_floors: 4,
                year_built: None,
                description: None,
            },
            "alice",
        )
        .unwrap();
        repos.buildings.create(&building).await.unwrap();
        let svc = FundService::new(
            repos.funds.clone(),
            repos.buildings.clone(),
            repos.costs.clone(),
            repos.charges.clone(),
        );
        (repos, svc, building)
    }

    fn input(building_id: Uuid, name: &str, balance: Decimal) -> FundCreate {
        FundCreate {
            building_id,
            name: name.into(),
            description: String::new(),
            fund_type: FundType::Reserve,
            status: FundStatus::Active,
            current_balance: balance,
            target_amount: Some(dec!(10000)),
            minimum_balance: Decimal::ZERO,
            manager: "Board".into(),
            requires_approval: true,
            approval_threshold: Some(dec!(500)),
            withdrawal_limit: None,
            last_audit_date: None,
            next_audit_date: None,
            notes: None,
        }
    }

    fn tx(kind: FundTransactionType, amount: Decimal) -> FundTransactionCreate {
        FundTransactionCreate {
            transaction_type: kind,
            payment_method: PaymentMethod::BankTransfer,
            amount,
            reference_number: None,
            cost_id: None,
            charge_id: None,
            description: "ledger".into(),
            transaction_date: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_fund_name_unique_per_building() {
        let (_, svc, building) = setup().await;
        svc.create(input(building.id, "Reserve", Decimal::ZERO), "alice")
            .await
            .unwrap();
        let err = svc
            .create(input(building.id, "reserve", Decimal::ZERO), "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::AlreadyExists { field: "name", .. }));
    }

    #[tokio::test]
    async fn test_restore_rejects_name_reused_meanwhile() {
        let (_, svc, building) = setup().await;
        let original = svc
            .create(input(building.id, "Reserve", Decimal::ZERO), "alice")
            .await
            .unwrap();
        svc.soft_delete(original.id, "alice").await.unwrap();
        svc.create(input(building.id, "RESERVE", Decimal::ZERO), "alice")
            .await
            .unwrap();

        let err = svc.restore(original.id, "alice").await.unwrap_err();
        assert!(matches!(err, DomainError::AlreadyExists { field: "name", .. }));
        assert!(svc.get(original.id).await.is_err());
    }

    #[tokio::test]
    async fn test_ledger_and_approval() {
        let (_, svc, building) = setup().await;
        let fund = svc
            .create(input(building.id, "Reserve", dec!(1000)), "alice")
            .await
            .unwrap();

        let receipt = svc
            .record_transaction(fund.id, tx(FundTransactionType::Withdrawal, dec!(200)), "bob")
            .await
            .unwrap();
        assert_eq!(receipt.transaction.status, FundTransactionStatus::Completed);
        assert_eq!(receipt.fund.fund.current_balance, dec!(800));

        let pending = svc
            .record_transaction(fund.id, tx(FundTransactionType::Withdrawal, dec!(600)), "bob")
            .await
            .unwrap();
        assert_eq!(pending.transaction.status, FundTransactionStatus::Pending);
        assert_eq!(pending.fund.fund.current_balance, dec!(800));

        let approved = svc
            .approve_transaction(fund.id, pending.transaction.id, "carol")
            .await
            .unwrap();
        assert_eq!(approved.transaction.status, FundTransactionStatus::Completed);
        assert_eq!(approved.fund.fund.current_balance, dec!(200));

        let ledger = svc.transactions(fund.id, DateRange::default()).await.unwrap();
        assert_eq!(ledger.len(), 2);

        let err = svc
            .record_transaction(fund.id, tx(FundTransactionType::Fee, dec!(250)), "bob")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InsufficientFunds { .. }));

        let err = svc.soft_delete(fund.id, "alice").await.unwrap_err();
        assert_eq!(err.code(), "FUND_NOT_EMPTY");
    }

    #[tokio::test]
    async fn test_missing_pending_transaction() {
        let (_, svc, building) = setup().await;
        let fund = svc
            .create(input(building.id, "Ops", dec!(10)), "alice")
            .await
            .unwrap();
        let err = svc
            .approve_transaction(fund.id, Uuid::new_v4(), "carol")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { resource: "FundTransaction", .. }));
    }

    #[tokio::test]
    async fn test_monthly_report_balances() {
        let (_, svc, building) = setup().await;
        let fund = svc
            .create(input(building.id, "Reserve", dec!(100)), "alice")
            .await
            .unwrap();

        let now = Utc::now();
        let mut last_month = tx(FundTransactionType::Contribution, dec!(50));
        last_month.transaction_date = Some(now - Duration::days(40));
        svc.record_transaction(fund.id, last_month, "bob").await.unwrap();
        svc.record_transaction(fund.id, tx(FundTransactionType::Contribution, dec!(30)), "bob")
            .await
            .unwrap();
        svc.record_transaction(fund.id, tx(FundTransactionType::Fee, dec!(5)), "bob")
            .await
            .unwrap();

        let report = svc
            .monthly_report(fund.id, now.year(), now.month())
            .await
            .unwrap();
        assert_eq!(report.opening_balance, dec!(150));
        assert_eq!(report.closing_balance, dec!(175));
        assert_eq!(report.total_inflow, dec!(30));
        assert_eq!(report.total_outflow, dec!(5));
        assert_eq!(report.transactions.len(), 2);

        let err = svc.monthly_report(fund.id, 2025, 13).await.unwrap_err();
        assert!(matches!(err, DomainError::ValidationError(_)));

        let stats = svc.statistics(building.id).await.unwrap();
        assert_eq!(stats.total_funds, 1);
        assert_eq!(stats.total_balance, dec!(175));
    }
}
