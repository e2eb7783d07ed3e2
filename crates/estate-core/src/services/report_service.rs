//! Cross-resource reports: occupancy, debtors, income/expenses and the
//! dashboard summary.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use estate_shared::Pagination;

use super::crud::require_active;
use super::Totals;
use crate::domain::money::{percentage, round2};
use crate::domain::{ChargeStatus, CostStatus, Entity, TransactionStatus};
use crate::error::DomainError;
use crate::repositories::{
    BuildingFilter, BuildingRepository, ChargeFilter, ChargeRepository, CostFilter,
    CostRepository, DateRange, FloorFilter, FloorRepository, FundFilter, FundRepository,
    OwnerRepository, Repository, TenantFilter, TenantRepository, TransactionFilter,
    TransactionRepository, UnitFilter, UnitRepository,
};

#[derive(Debug, Clone, Serialize)]
pub struct BuildingOccupancy {
    pub building_id: Uuid,
    pub building_name: String,
    pub total_floors: i64,
    pub total_units: i64,
    pub occupied_units: i64,
    pub vacant_units: i64,
    pub occupancy_rate: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct OccupancyReport {
    pub buildings: Vec<BuildingOccupancy>,
    pub total_units: i64,
    pub occupied_units: i64,
    pub occupancy_rate: Decimal,
}

/// One unit (or a building-level account when `unit_id` is absent) with
/// unpaid charges.
#[derive(Debug, Clone, Serialize)]
pub struct Debtor {
    pub building_id: Uuid,
    pub unit_id: Option<Uuid>,
    pub unit_number: Option<String>,
    pub owner_name: Option<String>,
    pub tenant_name: Option<String>,
    pub open_charges: i64,
    pub overdue_charges: i64,
    pub balance_due: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct DebtorsReport {
    pub debtors: Vec<Debtor>,
    pub total_outstanding: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct IncomeExpensesReport {
    pub building_id: Option<Uuid>,
    pub range: DateRange,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub net: Decimal,
    pub income_by_type: BTreeMap<String, Totals>,
    pub expenses_by_type: BTreeMap<String, Totals>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_buildings: i64,
    pub total_units: i64,
    pub occupied_units: i64,
    pub occupancy_rate: Decimal,
    pub total_owners: i64,
    pub active_tenants: i64,
    pub outstanding_balance: Decimal,
    pub overdue_charges: i64,
    pub total_fund_balance: Decimal,
    pub low_balance_funds: i64,
    pub open_costs: i64,
}

pub struct ReportService {
    buildings: Arc<BuildingRepository>,
    floors: Arc<FloorRepository>,
    units: Arc<UnitRepository>,
    owners: Arc<OwnerRepository>,
    tenants: Arc<TenantRepository>,
    charges: Arc<dyn ChargeRepository>,
    costs: Arc<CostRepository>,
    funds: Arc<dyn FundRepository>,
    transactions: Arc<TransactionRepository>,
}

impl ReportService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        buildings: Arc<BuildingRepository>,
        floors: Arc<FloorRepository>,
        units: Arc<UnitRepository>,
        owners: Arc<OwnerRepository>,
        tenants: Arc<TenantRepository>,
        charges: Arc<dyn ChargeRepository>,
        costs: Arc<CostRepository>,
        funds: Arc<dyn FundRepository>,
        transactions: Arc<TransactionRepository>,
    ) -> Self {
        Self {
            buildings,
            floors,
            units,
            owners,
            tenants,
            charges,
            costs,
            funds,
            transactions,
        }
    }

    pub async fn occupancy(&self, building_id: Option<Uuid>) -> Result<OccupancyReport, DomainError> {
        let buildings = match building_id {
            Some(id) => vec![require_active(self.buildings.as_ref(), id).await?],
            None => {
                self.buildings
                    .list(&BuildingFilter::default(), Pagination::unbounded())
                    .await?
            }
        };

        let mut report = OccupancyReport {
            buildings: Vec::with_capacity(buildings.len()),
            total_units: 0,
            occupied_units: 0,
            occupancy_rate: Decimal::ZERO,
        };
        for building in buildings {
            let floors = self
                .floors
                .list(
                    &FloorFilter {
                        building_id: Some(building.id),
                        ..Default::default()
                    },
                    Pagination::unbounded(),
                )
                .await?;

            let mut total_units = 0i64;
            let mut occupied_units = 0i64;
            for floor in &floors {
                let units = self
                    .units
                    .list(
                        &UnitFilter {
                            floor_id: Some(floor.id),
                            ..Default::default()
                        },
                        Pagination::unbounded(),
                    )
                    .await?;
                total_units += units.len() as i64;
                occupied_units += units.iter().filter(|u| u.is_occupied).count() as i64;
            }

            report.total_units += total_units;
            report.occupied_units += occupied_units;
            report.buildings.push(BuildingOccupancy {
                building_id: building.id,
                building_name: building.name,
                total_floors: floors.len() as i64,
                total_units,
                occupied_units,
                vacant_units: total_units - occupied_units,
                occupancy_rate: percentage(occupied_units.into(), total_units.into()),
            });
        }
        report.occupancy_rate = percentage(report.occupied_units.into(), report.total_units.into());
        Ok(report)
    }

    /// Units with an outstanding balance, largest debt first.
    pub async fn debtors(&self, building_id: Option<Uuid>) -> Result<DebtorsReport, DomainError> {
        if let Some(id) = building_id {
            require_active(self.buildings.as_ref(), id).await?;
        }
        let charges = self
            .charges
            .list(
                &ChargeFilter {
                    building_id,
                    ..Default::default()
                },
                Pagination::unbounded(),
            )
            .await?;

        let now = Utc::now();
        let mut grouped: HashMap<(Uuid, Option<Uuid>), Debtor> = HashMap::new();
        for charge in charges.iter().filter(|c| {
            !matches!(c.status, ChargeStatus::Paid | ChargeStatus::Cancelled)
                && c.balance_due() > Decimal::ZERO
        }) {
            let debtor = grouped
                .entry((charge.building_id, charge.unit_id))
                .or_insert_with(|| Debtor {
                    building_id: charge.building_id,
                    unit_id: charge.unit_id,
                    unit_number: None,
                    owner_name: None,
                    tenant_name: None,
                    open_charges: 0,
                    overdue_charges: 0,
                    balance_due: Decimal::ZERO,
                });
            debtor.open_charges += 1;
            if charge.is_overdue_at(now) || charge.status == ChargeStatus::Overdue {
                debtor.overdue_charges += 1;
            }
            debtor.balance_due += charge.balance_due();
        }

        let mut debtors: Vec<Debtor> = grouped.into_values().collect();
        for debtor in &mut debtors {
            debtor.balance_due = round2(debtor.balance_due);
            let Some(unit_id) = debtor.unit_id else {
                continue;
            };
            let Some(unit) = self.units.find_by_id(unit_id).await? else {
                continue;
            };
            if let Some(owner_id) = unit.owner_id {
                debtor.owner_name = self
                    .owners
                    .find_by_id(owner_id)
                    .await?
                    .filter(|o| !o.is_deleted())
                    .map(|o| o.name);
            }
            debtor.tenant_name = self
                .tenants
                .list(
                    &TenantFilter {
                        unit_id: Some(unit_id),
                        ..Default::default()
                    },
                    Pagination::unbounded(),
                )
                .await?
                .into_iter()
                .find(|t| t.is_resident())
                .map(|t| t.name);
            debtor.unit_number = Some(unit.unit_number);
        }
        debtors.sort_by(|a, b| b.balance_due.cmp(&a.balance_due));

        let total_outstanding = round2(debtors.iter().map(|d| d.balance_due).sum());
        Ok(DebtorsReport {
            debtors,
            total_outstanding,
        })
    }

    /// Completed transaction net amounts against cost amounts (actual when
    /// known, estimated otherwise) for the window.
    pub async fn income_expenses(
        &self,
        range: DateRange,
        building_id: Option<Uuid>,
    ) -> Result<IncomeExpensesReport, DomainError> {
        if let Some(id) = building_id {
            require_active(self.buildings.as_ref(), id).await?;
        }
        let transactions = self
            .transactions
            .list(
                &TransactionFilter {
                    building_id,
                    status: Some(TransactionStatus::Completed),
                    ..Default::default()
                },
                Pagination::unbounded(),
            )
            .await?;
        let costs = self
            .costs
            .list(
                &CostFilter {
                    building_id,
                    ..Default::default()
                },
                Pagination::unbounded(),
            )
            .await?;

        let mut report = IncomeExpensesReport {
            building_id,
            range,
            total_income: Decimal::ZERO,
            total_expenses: Decimal::ZERO,
            net: Decimal::ZERO,
            income_by_type: BTreeMap::new(),
            expenses_by_type: BTreeMap::new(),
        };
        for tx in transactions
            .iter()
            .filter(|t| range.contains(t.payment_date.unwrap_or(t.due_date)))
        {
            let amount = tx.net_amount();
            report.total_income += amount;
            report
                .income_by_type
                .entry(tx.transaction_type.to_string())
                .or_default()
                .add(amount);
        }
        for cost in costs.iter().filter(|c| {
            c.status != CostStatus::Cancelled
                && range.contains(c.actual_date.unwrap_or(c.planned_date))
        }) {
            let amount = cost.effective_amount();
            report.total_expenses += amount;
            report
                .expenses_by_type
                .entry(cost.cost_type.to_string())
                .or_default()
                .add(amount);
        }
        report.total_income = round2(report.total_income);
        report.total_expenses = round2(report.total_expenses);
        report.net = report.total_income - report.total_expenses;
        Ok(report)
    }

    pub async fn summary(&self) -> Result<DashboardSummary, DomainError> {
        let occupancy = self.occupancy(None).await?;
        let debtors = self.debtors(None).await?;
        let active_tenants = self
            .tenants
            .list(&TenantFilter::default(), Pagination::unbounded())
            .await?
            .iter()
            .filter(|t| t.is_resident())
            .count() as i64;
        let funds = self
            .funds
            .list(&FundFilter::default(), Pagination::unbounded())
            .await?;
        let open_costs = self
            .costs
            .list(&CostFilter::default(), Pagination::unbounded())
            .await?
            .iter()
            .filter(|c| !matches!(c.status, CostStatus::Completed | CostStatus::Cancelled))
            .count() as i64;

        Ok(DashboardSummary {
            total_buildings: occupancy.buildings.len() as i64,
            total_units: occupancy.total_units,
            occupied_units: occupancy.occupied_units,
            occupancy_rate: occupancy.occupancy_rate,
            total_owners: self.owners.count(false).await?,
            active_tenants,
            outstanding_balance: debtors.total_outstanding,
            overdue_charges: debtors.debtors.iter().map(|d| d.overdue_charges).sum(),
            total_fund_balance: round2(funds.iter().map(|f| f.current_balance).sum()),
            low_balance_funds: funds.iter().filter(|f| f.is_low_balance()).count() as i64,
            open_costs,
        })
    }
}
