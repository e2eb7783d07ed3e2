//! Charge service: billing, payments and collection statistics

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use estate_shared::Pagination;

use super::crud::{require_active, Crud, CrudService};
use super::{month_bounds, Totals};
use crate::domain::money::{percentage, round2};
use crate::domain::{
    Charge, ChargeCreate, ChargeFrequency, ChargeStatus, ChargeType, ChargeUpdate, ChargeView,
    Payment, PaymentCreate, Unit,
};
use crate::error::DomainError;
use crate::repositories::{
    BuildingRepository, ChargeFilter, ChargeRepository, DateRange, FloorFilter, FloorRepository,
    OwnerRepository, Repository, TenantFilter, TenantRepository, UnitFilter, UnitRepository,
};

/// Result of recording a payment: the updated charge and the ledger row.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub charge: ChargeView,
    pub payment: Payment,
}

/// Query of `POST /charges/calculate-monthly`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonthlyBilling {
    pub year: i32,
    pub month: u32,
    /// Restrict the run to one building.
    pub building_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChargeStatistics {
    pub building_id: Uuid,
    pub range: DateRange,
    pub total_charges: i64,
    pub total_amount: Decimal,
    pub total_paid: Decimal,
    pub total_pending: Decimal,
    pub overdue_count: i64,
    pub collection_rate: Decimal,
    pub by_type: BTreeMap<String, Totals>,
    pub by_status: BTreeMap<String, i64>,
    /// Keyed by due month, `YYYY-MM`.
    pub by_month: BTreeMap<String, Totals>,
}

pub struct ChargeService {
    crud: Crud<Charge, ChargeFilter, dyn ChargeRepository>,
    buildings: Arc<BuildingRepository>,
    floors: Arc<FloorRepository>,
    units: Arc<UnitRepository>,
    owners: Arc<OwnerRepository>,
    tenants: Arc<TenantRepository>,
}

impl ChargeService {
    pub fn new(
        charges: Arc<dyn ChargeRepository>,
        buildings: Arc<BuildingRepository>,
        floors: Arc<FloorRepository>,
        units: Arc<UnitRepository>,
        owners: Arc<OwnerRepository>,
        tenants: Arc<TenantRepository>,
    ) -> Self {
        Self {
            crud: Crud::new(charges),
            buildings,
            floors,
            units,
            owners,
            tenants,
        }
    }

    async fn check_links(
        &self,
        unit_id: Option<Uuid>,
        owner_id: Option<Uuid>,
        tenant_id: Option<Uuid>,
    ) -> Result<(), DomainError> {
        if let Some(id) = unit_id {
            require_active(self.units.as_ref(), id).await?;
        }
        if let Some(id) = owner_id {
            require_active(self.owners.as_ref(), id).await?;
        }
        if let Some(id) = tenant_id {
            require_active(self.tenants.as_ref(), id).await?;
        }
        Ok(())
    }

    pub async fn record_payment(
        &self,
        id: Uuid,
        input: PaymentCreate,
        actor: &str,
    ) -> Result<PaymentReceipt, DomainError> {
        let mut charge = self.crud.get(id).await?;
        let previous_paid = charge.amount_paid;
        let payment = charge.record_payment(input, actor).inspect_err(|e| {
            warn!("Payment on charge {} rejected: {}", id, e);
        })?;

        let saved = self
            .crud
            .repo()
            .record_payment(&charge, previous_paid, &payment)
            .await?;
        info!(
            "Payment {} of {} recorded on charge {} (status {})",
            payment.id, payment.amount, id, saved.status
        );
        Ok(PaymentReceipt {
            charge: saved.into(),
            payment,
        })
    }

    pub async fn payments(&self, id: Uuid) -> Result<Vec<Payment>, DomainError> {
        self.crud.get(id).await?;
        self.crud.repo().list_payments(id).await
    }

    /// Move every pending charge past its due date to `overdue`.
    pub async fn refresh_overdue(&self, now: DateTime<Utc>, actor: &str) -> Result<usize, DomainError> {
        let pending = self
            .crud
            .all(&ChargeFilter {
                status: Some(ChargeStatus::Pending),
                ..Default::default()
            })
            .await?;

        let mut updated = 0;
        for mut charge in pending {
            if charge.mark_overdue(now, actor) {
                self.crud.save(&charge).await?;
                updated += 1;
            }
        }
        info!("Marked {} charges overdue", updated);
        Ok(updated)
    }

    /// Bill every occupied unit its constant monthly charge for `year`-`month`.
    ///
    /// Units already carrying a monthly recurring charge due in that month and
    /// units without a constant charge are skipped.
    pub async fn generate_monthly(
        &self,
        billing: MonthlyBilling,
        actor: &str,
    ) -> Result<Vec<Charge>, DomainError> {
        let (start, end) = month_bounds(billing.year, billing.month)?;
        if let Some(id) = billing.building_id {
            require_active(self.buildings.as_ref(), id).await?;
        }

        let floors = self
            .floors
            .list(
                &FloorFilter {
                    building_id: billing.building_id,
                    ..Default::default()
                },
                Pagination::unbounded(),
            )
            .await?;
        let units = self
            .units
            .list(
                &UnitFilter {
                    is_occupied: Some(true),
                    ..Default::default()
                },
                Pagination::unbounded(),
            )
            .await?;

        let mut generated = Vec::new();
        for unit in units {
            let Some(floor) = floors.iter().find(|f| f.id == unit.floor_id) else {
                continue;
            };
            if unit.constant_extra_charge <= Decimal::ZERO {
                warn!("Unit {} has no constant charge, skipping", unit.id);
                continue;
            }
            if self.billed_for_month(unit.id, start, end).await? {
                continue;
            }

            let tenant_id = self.tenant_during(&unit, start, end).await?;
            let charge = Charge::new(
                ChargeCreate {
                    building_id: floor.building_id,
                    unit_id: Some(unit.id),
                    owner_id: unit.owner_id,
                    tenant_id,
                    title: format!(
                        "Monthly charge {}-{:02} unit {}",
                        start.year(),
                        start.month(),
                        unit.unit_number
                    ),
                    description: String::new(),
                    amount: unit.constant_extra_charge,
                    charge_type: ChargeType::Recurring,
                    status: ChargeStatus::Pending,
                    due_date: end - Duration::days(1),
                    frequency: ChargeFrequency::Monthly,
                    recurring: true,
                    generated_by: None,
                    notes: None,
                    tax_rate: Decimal::ZERO,
                    is_taxable: false,
                },
                actor,
            )?;
            generated.push(self.crud.insert(charge).await?);
        }

        info!(
            "Generated {} monthly charges for {}-{:02}",
            generated.len(),
            billing.year,
            billing.month
        );
        Ok(generated)
    }

    async fn billed_for_month(
        &self,
        unit_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let existing = self
            .crud
            .all(&ChargeFilter {
                unit_id: Some(unit_id),
                charge_type: Some(ChargeType::Recurring),
                due_from: Some(start),
                due_to: Some(end),
                ..Default::default()
            })
            .await?;
        Ok(existing
            .iter()
            .any(|c| c.frequency == ChargeFrequency::Monthly && c.due_date < end))
    }

    /// Tenant whose lease covers part of `[start, end)`.
    async fn tenant_during(
        &self,
        unit: &Unit,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<Uuid>, DomainError> {
        let tenants = self
            .tenants
            .list(
                &TenantFilter {
                    unit_id: Some(unit.id),
                    ..Default::default()
                },
                Pagination::unbounded(),
            )
            .await?;
        let last_day = (end - Duration::days(1)).date_naive();
        Ok(tenants
            .iter()
            .find(|t| t.overlaps(start.date_naive(), last_day))
            .map(|t| t.id))
    }

    pub async fn statistics(
        &self,
        building_id: Uuid,
        range: DateRange,
    ) -> Result<ChargeStatistics, DomainError> {
        require_active(self.buildings.as_ref(), building_id).await?;
        let charges = self
            .crud
            .all(&ChargeFilter {
                building_id: Some(building_id),
                due_from: range.start,
                due_to: range.end,
                ..Default::default()
            })
            .await?;

        let now = Utc::now();
        let mut stats = ChargeStatistics {
            building_id,
            range,
            total_charges: charges.len() as i64,
            total_amount: Decimal::ZERO,
            total_paid: Decimal::ZERO,
            total_pending: Decimal::ZERO,
            overdue_count: 0,
            collection_rate: Decimal::ZERO,
            by_type: BTreeMap::new(),
            by_status: BTreeMap::new(),
            by_month: BTreeMap::new(),
        };

        for charge in &charges {
            *stats.by_status.entry(charge.status.to_string()).or_default() += 1;
            if charge.status == ChargeStatus::Cancelled {
                continue;
            }
            let total = charge.total_amount();
            stats.total_amount += total;
            stats.total_paid += charge.amount_paid;
            stats.total_pending += charge.balance_due().max(Decimal::ZERO);
            if charge.is_overdue_at(now) {
                stats.overdue_count += 1;
            }
            stats
                .by_type
                .entry(charge.charge_type.to_string())
                .or_default()
                .add(total);
            stats
                .by_month
                .entry(charge.due_date.format("%Y-%m").to_string())
                .or_default()
                .add(total);
        }

        stats.total_amount = round2(stats.total_amount);
        stats.total_paid = round2(stats.total_paid);
        stats.total_pending = round2(stats.total_pending);
        stats.collection_rate = percentage(stats.total_paid, stats.total_amount);
        Ok(stats)
    }
}

#[async_trait]
impl CrudService for ChargeService {
    type Entity = Charge;
    type Filter = ChargeFilter;
    type Create = ChargeCreate;
    type Update = ChargeUpdate;
    type Repo = dyn ChargeRepository;

    fn crud(&self) -> &Crud<Charge, ChargeFilter, dyn ChargeRepository> {
        &self.crud
    }

    async fn create(&self, input: ChargeCreate, actor: &str) -> Result<Charge, DomainError> {
        let charge = Charge::new(input, actor)?;
        require_active(self.buildings.as_ref(), charge.building_id).await?;
        self.check_links(charge.unit_id, charge.owner_id, charge.tenant_id)
            .await?;
        self.crud.insert(charge).await
    }

    async fn update(&self, id: Uuid, changes: ChargeUpdate, actor: &str) -> Result<Charge, DomainError> {
        let mut charge = self.crud.get(id).await?;
        self.check_links(
            changes.unit_id.filter(|u| Some(*u) != charge.unit_id),
            changes.owner_id.filter(|o| Some(*o) != charge.owner_id),
            changes.tenant_id.filter(|t| Some(*t) != charge.tenant_id),
        )
        .await?;
        charge.apply(changes, actor)?;
        self.crud.save(&charge).await
    }

    /// Deleting a charge also cancels it; paid charges stay.
    async fn soft_delete(&self, id: Uuid, actor: &str) -> Result<Charge, DomainError> {
        let mut charge = self.crud.get_any(id).await?;
        if !charge.audit.is_deleted {
            charge.ensure_not_paid()?;
            charge.cancel(actor);
        }
        self.crud.soft_delete_entity(charge, actor).await
    }

    async fn hard_delete(&self, id: Uuid) -> Result<(), DomainError> {
        let charge = self.crud.get_any(id).await?;
        charge.ensure_not_paid()?;
        self.crud.hard_delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Building, BuildingCreate, ChargeFrequency, ChargeType};
    use crate::memory::repositories;
    use crate::repositories::Repositories;
    use crate::domain::{Floor, FloorCreate, UnitCreate, UnitStatus, UnitType};
    use mockall::mock;
    use rust_decimal_macros::dec;

    mock! {
        pub Charges {}

        #[async_trait]
        impl Repository<Charge, ChargeFilter> for Charges {
            async fn find_by_id(&self, id: Uuid) -> Result<Option<Charge>, DomainError>;
            async fn list(&self, filter: &ChargeFilter, page: Pagination) -> Result<Vec<Charge>, DomainError>;
            async fn list_deleted(&self, page: Pagination) -> Result<Vec<Charge>, DomainError>;
            async fn count(&self, include_deleted: bool) -> Result<i64, DomainError>;
            async fn create(&self, entity: &Charge) -> Result<Charge, DomainError>;
            async fn update(&self, entity: &Charge) -> Result<Charge, DomainError>;
            async fn hard_delete(&self, id: Uuid) -> Result<bool, DomainError>;
        }

        #[async_trait]
        impl ChargeRepository for Charges {
            async fn record_payment(
                &self,
                charge: &Charge,
                previous_paid: Decimal,
                payment: &Payment,
            ) -> Result<Charge, DomainError>;
            async fn list_payments(&self, charge_id: Uuid) -> Result<Vec<Payment>, DomainError>;
        }
    }

    async fn building(repos: &Repositories) -> Building {
        let building = Building::new(
            BuildingCreate {
                name: "Harbor View".into(),
                address: None,
                total_floors: 8,
                year_built: None,
                description: None,
            },
            "alice",
        )
        .unwrap();
        repos.buildings.create(&building).await.unwrap()
    }

    fn service(repos: &Repositories, charges: Arc<dyn ChargeRepository>) -> ChargeService {
        ChargeService::new(
            charges,
            repos.buildings.clone(),
            repos.floors.clone(),
            repos.units.clone(),
            repos.owners.clone(),
            repos.tenants.clone(),
        )
    }

    fn input(building_id: Uuid, amount: Decimal, due_in_days: i64) -> ChargeCreate {
        ChargeCreate {
            building_id,
            unit_id: None,
            owner_id: None,
            tenant_id: None,
            title: "Service charge".into(),
            description: String::new(),
            amount,
            charge_type: ChargeType::Maintenance,
            status: ChargeStatus::Pending,
            due_date: Utc::now() + Duration::days(due_in_days),
            frequency: ChargeFrequency::Monthly,
            recurring: true,
            generated_by: None,
            notes: None,
            tax_rate: Decimal::ZERO,
            is_taxable: false,
        }
    }

    async fn unit_with(
        repos: &Repositories,
        floor_id: Uuid,
        number: &str,
        status: UnitStatus,
        monthly: Decimal,
    ) -> Unit {
        let unit = Unit::new(
            UnitCreate {
                floor_id,
                owner_id: None,
                unit_number: number.into(),
                unit_type: UnitType::Residential,
                status,
                area: dec!(55),
                has_parking: false,
                parking_space_number: None,
                resident_count: 1,
                constant_extra_charge: monthly,
            },
            "alice",
        )
        .unwrap();
        repos.units.create(&unit).await.unwrap()
    }

    async fn floor(repos: &Repositories, building_id: Uuid) -> Floor {
        let floor = Floor::new(
            FloorCreate {
                building_id,
                number: 1,
                name: "First".into(),
                total_units: 10,
                description: None,
            },
            "alice",
        )
        .unwrap();
        repos.floors.create(&floor).await.unwrap()
    }

    fn payment(amount: Decimal) -> PaymentCreate {
        PaymentCreate {
            amount,
            payment_method: "bank_transfer".into(),
            reference: "WIRE-77".into(),
            payment_date: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_payment_flow() {
        let repos = repositories();
        let b = building(&repos).await;
        let svc = service(&repos, repos.charges.clone());

        let charge = svc.create(input(b.id, dec!(100), 5), "alice").await.unwrap();
        let receipt = svc.record_payment(charge.id, payment(dec!(40)), "bob").await.unwrap();
        assert_eq!(receipt.charge.charge.status, ChargeStatus::PartiallyPaid);
        assert_eq!(receipt.charge.balance_due, dec!(60));

        let err = svc
            .record_payment(charge.id, payment(dec!(61)), "bob")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "OVERPAYMENT");

        let receipt = svc.record_payment(charge.id, payment(dec!(60)), "bob").await.unwrap();
        assert_eq!(receipt.charge.charge.status, ChargeStatus::Paid);

        let payments = svc.payments(charge.id).await.unwrap();
        assert_eq!(payments.len(), 2);
        assert_eq!(payments.iter().map(|p| p.amount).sum::<Decimal>(), dec!(100));

        let err = svc.soft_delete(charge.id, "bob").await.unwrap_err();
        assert_eq!(err.code(), "CHARGE_PAID");
        let err = svc.hard_delete(charge.id).await.unwrap_err();
        assert_eq!(err.code(), "CHARGE_PAID");
    }

    #[tokio::test]
    async fn test_soft_delete_cancels_charge() {
        let repos = repositories();
        let b = building(&repos).await;
        let svc = service(&repos, repos.charges.clone());

        let charge = svc.create(input(b.id, dec!(10), 5), "alice").await.unwrap();
        let deleted = svc.soft_delete(charge.id, "bob").await.unwrap();
        assert_eq!(deleted.status, ChargeStatus::Cancelled);
        assert!(deleted.audit.is_deleted);
    }

    #[tokio::test]
    async fn test_refresh_overdue_and_statistics() {
        let repos = repositories();
        let b = building(&repos).await;
        let svc = service(&repos, repos.charges.clone());

        let late = svc.create(input(b.id, dec!(100), -3), "alice").await.unwrap();
        let upcoming = svc.create(input(b.id, dec!(50), 3), "alice").await.unwrap();
        svc.record_payment(upcoming.id, payment(dec!(50)), "bob").await.unwrap();

        assert_eq!(svc.refresh_overdue(Utc::now(), "system").await.unwrap(), 1);
        assert_eq!(svc.get(late.id).await.unwrap().status, ChargeStatus::Overdue);

        let stats = svc.statistics(b.id, DateRange::default()).await.unwrap();
        assert_eq!(stats.total_charges, 2);
        assert_eq!(stats.total_amount, dec!(150));
        assert_eq!(stats.total_paid, dec!(50));
        assert_eq!(stats.total_pending, dec!(100));
        assert_eq!(stats.overdue_count, 1);
        assert_eq!(stats.collection_rate, dec!(33.33));
        assert_eq!(stats.by_status.get("paid"), Some(&1));
        assert_eq!(stats.by_type["maintenance"].count, 2);
    }

    #[tokio::test]
    async fn test_generate_monthly_bills_occupied_units_once() {
        let repos = repositories();
        let b = building(&repos).await;
        let other = building(&repos).await;
        let f = floor(&repos, b.id).await;
        let other_floor = floor(&repos, other.id).await;
        let billed = unit_with(&repos, f.id, "1A", UnitStatus::Occupied, dec!(150)).await;
        unit_with(&repos, f.id, "1B", UnitStatus::Occupied, Decimal::ZERO).await;
        unit_with(&repos, f.id, "1C", UnitStatus::Vacant, dec!(80)).await;
        let elsewhere =
            unit_with(&repos, other_floor.id, "1A", UnitStatus::Occupied, dec!(90)).await;
        let svc = service(&repos, repos.charges.clone());
        let billing = |building_id| MonthlyBilling {
            year: 2030,
            month: 5,
            building_id,
        };

        let charges = svc.generate_monthly(billing(Some(b.id)), "system").await.unwrap();
        assert_eq!(charges.len(), 1);
        let charge = &charges[0];
        assert_eq!(charge.unit_id, Some(billed.id));
        assert_eq!(charge.building_id, b.id);
        assert_eq!(charge.amount, dec!(150));
        assert_eq!(charge.charge_type, ChargeType::Recurring);
        assert_eq!(charge.frequency, ChargeFrequency::Monthly);
        assert!(charge.recurring);
        assert_eq!(charge.due_date.format("%Y-%m-%d").to_string(), "2030-05-31");

        let again = svc.generate_monthly(billing(Some(b.id)), "system").await.unwrap();
        assert!(again.is_empty());

        let rest = svc.generate_monthly(billing(None), "system").await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].unit_id, Some(elsewhere.id));
        assert_eq!(rest[0].building_id, other.id);

        let june = svc
            .generate_monthly(
                MonthlyBilling {
                    year: 2030,
                    month: 6,
                    building_id: Some(b.id),
                },
                "system",
            )
            .await
            .unwrap();
        assert_eq!(june.len(), 1);
    }

    #[tokio::test]
    async fn test_generate_monthly_rejects_bad_month() {
        let repos = repositories();
        let svc = service(&repos, repos.charges.clone());
        let err = svc
            .generate_monthly(
                MonthlyBilling {
                    year: 2030,
                    month: 13,
                    building_id: None,
                },
                "system",
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_charge_requires_building() {
        let repos = repositories();
        let svc = service(&repos, repos.charges.clone());
        let err = svc
            .create(input(Uuid::new_v4(), dec!(10), 1), "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { resource: "Building", .. }));
    }

    #[tokio::test]
    async fn test_payment_guarded_by_previous_amount() {
        let repos = repositories();
        let b = building(&repos).await;
        let stored = Charge::new(input(b.id, dec!(100), 5), "alice").unwrap();
        let charge_id = stored.id;

        let mut mock = MockCharges::new();
        mock.expect_find_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        mock.expect_record_payment()
            .withf(|charge, previous_paid, payment| {
                *previous_paid == Decimal::ZERO
                    && charge.amount_paid == dec!(25)
                    && payment.amount == dec!(25)
            })
            .times(1)
            .returning(|_, _, _| Err(DomainError::Conflict("amount_paid changed".into())));

        let svc = service(&repos, Arc::new(mock));
        let err = svc
            .record_payment(charge_id, payment(dec!(25)), "bob")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }
}
