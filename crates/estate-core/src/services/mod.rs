//! Domain services (business logic)

use std::sync::Arc;

use chrono::{DateTime, Months, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::money::round2;
use crate::error::DomainError;
use crate::repositories::{HealthCheck, Repositories};

pub mod crud;

pub mod building_service;
pub mod floor_service;
pub mod unit_service;
pub mod owner_service;
pub mod tenant_service;
pub mod charge_service;
pub mod cost_service;
pub mod fund_service;
pub mod transaction_service;
pub mod report_service;

pub use crud::{Crud, CrudService};
pub use building_service::{BuildingService, BuildingStats};
pub use floor_service::{FloorService, FloorStats};
pub use unit_service::{UnitDetails, UnitService};
pub use owner_service::{OwnerDetails, OwnerService};
pub use tenant_service::{LeaseExtension, TenantService};
pub use charge_service::{ChargeService, ChargeStatistics, MonthlyBilling, PaymentReceipt};
pub use cost_service::{CostService, CostStatistics};
pub use fund_service::{FundMonthlyReport, FundService, FundStatistics, FundTransactionReceipt};
pub use transaction_service::{TransactionService, TransactionStatistics};
pub use report_service::{
    BuildingOccupancy, DashboardSummary, Debtor, DebtorsReport, IncomeExpensesReport,
    OccupancyReport, ReportService,
};

/// Count and summed amount of one statistics bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    pub count: i64,
    pub amount: Decimal,
}

impl Totals {
    pub fn add(&mut self, amount: Decimal) {
        self.count += 1;
        self.amount = round2(self.amount + amount);
    }
}

/// `[first instant, first instant of the next month)` of a calendar month.
pub(crate) fn month_bounds(
    year: i32,
    month: u32,
) -> Result<(DateTime<Utc>, DateTime<Utc>), DomainError> {
    let invalid = || DomainError::validation(format!("Invalid month {year}-{month:02}"));
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let next = first.checked_add_months(Months::new(1)).ok_or_else(invalid)?;
    Ok((
        first.and_time(NaiveTime::MIN).and_utc(),
        next.and_time(NaiveTime::MIN).and_utc(),
    ))
}

/// Every service wired against one set of repositories.
#[derive(Clone)]
pub struct Services {
    pub buildings: Arc<BuildingService>,
    pub floors: Arc<FloorService>,
    pub units: Arc<UnitService>,
    pub owners: Arc<OwnerService>,
    pub tenants: Arc<TenantService>,
    pub charges: Arc<ChargeService>,
    pub costs: Arc<CostService>,
    pub funds: Arc<FundService>,
    pub transactions: Arc<TransactionService>,
    pub reports: Arc<ReportService>,
    pub health: Arc<dyn HealthCheck>,
}

impl Services {
    pub fn new(repos: Repositories) -> Self {
        let Repositories {
            buildings,
            floors,
            units,
            owners,
            tenants,
            charges,
            costs,
            funds,
            transactions,
            health,
        } = repos;

        Self {
            buildings: Arc::new(BuildingService::new(
                buildings.clone(),
                floors.clone(),
                units.clone(),
            )),
            floors: Arc::new(FloorService::new(
                floors.clone(),
                buildings.clone(),
                units.clone(),
            )),
            units: Arc::new(UnitService::new(
                units.clone(),
                floors.clone(),
                owners.clone(),
                tenants.clone(),
                charges.clone(),
            )),
            owners: Arc::new(OwnerService::new(
                owners.clone(),
                units.clone(),
                charges.clone(),
            )),
            tenants: Arc::new(TenantService::new(tenants.clone(), units.clone())),
            charges: Arc::new(ChargeService::new(
                charges.clone(),
                buildings.clone(),
                floors.clone(),
                units.clone(),
                owners.clone(),
                tenants.clone(),
            )),
            costs: Arc::new(CostService::new(
                costs.clone(),
                buildings.clone(),
                floors.clone(),
                units.clone(),
            )),
            funds: Arc::new(FundService::new(
                funds.clone(),
                buildings.clone(),
                costs.clone(),
                charges.clone(),
            )),
            transactions: Arc::new(TransactionService::new(
                transactions.clone(),
                buildings.clone(),
                units.clone(),
                tenants.clone(),
                funds.clone(),
            )),
            reports: Arc::new(ReportService::new(
                buildings,
                floors,
                units,
                owners,
                tenants,
                charges,
                costs,
                funds,
                transactions,
            )),
            health,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_totals_accumulate() {
        let mut totals = Totals::default();
        totals.add(dec!(10.005));
        totals.add(dec!(5));
        assert_eq!(totals.count, 2);
        assert_eq!(totals.amount, dec!(15.01));
    }
}
