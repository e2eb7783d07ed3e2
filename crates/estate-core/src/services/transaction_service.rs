//! Transaction service: building-level payment records

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::crud::{require_active, Crud, CrudService};
use super::Totals;
use crate::domain::money::{percentage, round2};
use crate::domain::{
    Entity, Transaction, TransactionCreate, TransactionStatus, TransactionUpdate,
};
use crate::error::DomainError;
use crate::repositories::{
    BuildingRepository, DateRange, FundRepository, Repository, TenantRepository,
    TransactionFilter, TransactionRepository, UnitRepository,
};

#[derive(Debug, Clone, Serialize)]
pub struct TransactionStatistics {
    pub building_id: Uuid,
    pub range: DateRange,
    pub total_transactions: i64,
    pub total_amount: Decimal,
    /// Sum of `net_amount` over completed transactions.
    pub total_net: Decimal,
    pub successful: i64,
    pub failed: i64,
    pub pending: i64,
    pub success_rate: Decimal,
    pub by_type: BTreeMap<String, Totals>,
}

pub struct TransactionService {
    crud: Crud<Transaction, TransactionFilter, TransactionRepository>,
    buildings: Arc<BuildingRepository>,
    units: Arc<UnitRepository>,
    tenants: Arc<TenantRepository>,
    funds: Arc<dyn FundRepository>,
}

impl TransactionService {
    pub fn new(
        transactions: Arc<TransactionRepository>,
        buildings: Arc<BuildingRepository>,
        units: Arc<UnitRepository>,
        tenants: Arc<TenantRepository>,
        funds: Arc<dyn FundRepository>,
    ) -> Self {
        Self {
            crud: Crud::new(transactions),
            buildings,
            units,
            tenants,
            funds,
        }
    }

    async fn check_links(
        &self,
        unit_id: Option<Uuid>,
        tenant_id: Option<Uuid>,
        fund_id: Option<Uuid>,
    ) -> Result<(), DomainError> {
        if let Some(id) = unit_id {
            require_active(self.units.as_ref(), id).await?;
        }
        if let Some(id) = tenant_id {
            require_active(self.tenants.as_ref(), id).await?;
        }
        if let Some(id) = fund_id {
            match self.funds.find_by_id(id).await? {
                Some(fund) if !fund.is_deleted() => {}
                _ => return Err(DomainError::not_found("Fund", id)),
            }
        }
        Ok(())
    }

    pub async fn statistics(
        &self,
        building_id: Uuid,
        range: DateRange,
    ) -> Result<TransactionStatistics, DomainError> {
        require_active(self.buildings.as_ref(), building_id).await?;
        let transactions = self
            .crud
            .all(&TransactionFilter {
                building_id: Some(building_id),
                due_from: range.start,
                due_to: range.end,
                ..Default::default()
            })
            .await?;

        let mut stats = TransactionStatistics {
            building_id,
            range,
            total_transactions: transactions.len() as i64,
            total_amount: Decimal::ZERO,
            total_net: Decimal::ZERO,
            successful: 0,
            failed: 0,
            pending: 0,
            success_rate: Decimal::ZERO,
            by_type: BTreeMap::new(),
        };
        for tx in &transactions {
            stats.total_amount += tx.amount;
            match tx.status {
                TransactionStatus::Completed => {
                    stats.successful += 1;
                    stats.total_net += tx.net_amount();
                }
                TransactionStatus::Failed => stats.failed += 1,
                TransactionStatus::Pending => stats.pending += 1,
                _ => {}
            }
            stats
                .by_type
                .entry(tx.transaction_type.to_string())
                .or_default()
                .add(tx.amount);
        }
        stats.total_amount = round2(stats.total_amount);
        stats.total_net = round2(stats.total_net);
        stats.success_rate = percentage(
            Decimal::from(stats.successful),
            Decimal::from(stats.total_transactions),
        );
        Ok(stats)
    }
}

#[async_trait]
impl CrudService for TransactionService {
    type Entity = Transaction;
    type Filter = TransactionFilter;
    type Create = TransactionCreate;
    type Update = TransactionUpdate;
    type Repo = TransactionRepository;

    fn crud(&self) -> &Crud<Transaction, TransactionFilter, TransactionRepository> {
        &self.crud
    }

    async fn create(&self, input: TransactionCreate, actor: &str) -> Result<Transaction, DomainError> {
        let tx = Transaction::new(input, actor)?;
        require_active(self.buildings.as_ref(), tx.building_id).await?;
        self.check_links(tx.unit_id, tx.tenant_id, tx.fund_id).await?;
        let saved = self.crud.insert(tx).await?;
        info!(
            "Transaction {} recorded for building {} ({})",
            saved.reference_number, saved.building_id, saved.status
        );
        Ok(saved)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: TransactionUpdate,
        actor: &str,
    ) -> Result<Transaction, DomainError> {
        let mut tx = self.crud.get(id).await?;
        self.check_links(
            changes.unit_id.filter(|u| Some(*u) != tx.unit_id),
            changes.tenant_id.filter(|t| Some(*t) != tx.tenant_id),
            changes.fund_id.filter(|f| Some(*f) != tx.fund_id),
        )
        .await?;
        tx.apply(changes, actor)?;
        self.crud.save(&tx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Building, BuildingCreate, PaymentMethod, TransactionType};
    use crate::memory::repositories;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn input(building_id: Uuid, amount: Decimal, status: TransactionStatus) -> TransactionCreate {
        TransactionCreate {
            building_id,
            unit_id: None,
            tenant_id: None,
            fund_id: None,
            transaction_type: TransactionType::Rent,
            status,
            payment_method: PaymentMethod::BankTransfer,
            amount,
            description: Some("March rent".into()),
            reference_number: None,
            due_date: Utc::now(),
            payment_date: None,
            late_fee: Some(dec!(10)),
            discount: None,
            notes: None,
        }
    }

    async fn service() -> (TransactionService, Building) {
        let repos = repositories();
        let building = Building::new(
            BuildingCreate {
                name: "Harbor View".into(),
                address: None,
                total_floors: 3,
                year_built: None,
                description: None,
            },
            "alice",
        )
        .unwrap();
        repos.buildings.create(&building).await.unwrap();
        let svc = TransactionService::new(
            repos.transactions.clone(),
            repos.buildings.clone(),
            repos.units.clone(),
            repos.tenants.clone(),
            repos.funds.clone(),
        );
        (svc, building)
    }

    #[tokio::test]
    async fn test_completed_transactions_are_frozen() {
        let (svc, building) = service().await;
        let tx = svc
            .create(input(building.id, dec!(900), TransactionStatus::Pending), "alice")
            .await
            .unwrap();
        assert!(tx.reference_number.starts_with("TXN-"));

        let done = svc
            .update(
                tx.id,
                TransactionUpdate {
                    status: Some(TransactionStatus::Completed),
                    ..Default::default()
                },
                "bob",
            )
            .await
            .unwrap();
        assert_eq!(done.approved_by.as_deref(), Some("bob"));
        assert!(done.payment_date.is_some());

        let err = svc
            .update(
                tx.id,
                TransactionUpdate {
                    amount: Some(dec!(1)),
                    ..Default::default()
                },
                "bob",
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "COMPLETED_TRANSACTION");
    }

    #[tokio::test]
    async fn test_missing_fund_link() {
        let (svc, building) = service().await;
        let mut tx = input(building.id, dec!(50), TransactionStatus::Pending);
        tx.fund_id = Some(Uuid::new_v4());
        let err = svc.create(tx, "alice").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { resource: "Fund", .. }));
    }

    #[tokio::test]
    async fn test_statistics_success_rate() {
        let (svc, building) = service().await;
        svc.create(input(building.id, dec!(100), TransactionStatus::Completed), "a")
            .await
            .unwrap();
        svc.create(input(building.id, dec!(200), TransactionStatus::Failed), "a")
            .await
            .unwrap();
        svc.create(input(building.id, dec!(300), TransactionStatus::Pending), "a")
            .await
            .unwrap();
        svc.create(input(building.id, dec!(400), TransactionStatus::Completed), "a")
            .await
            .unwrap();

        let stats = svc.statistics(building.id, DateRange::default()).await.unwrap();
        assert_eq!(stats.total_transactions, 4);
        assert_eq!(stats.total_amount, dec!(1000));
        assert_eq!(stats.total_net, dec!(520));
        assert_eq!(stats.successful, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.success_rate, dec!(50));
        assert_eq!(stats.by_type["rent"].count, 4);
    }
}
