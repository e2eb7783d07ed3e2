//! Cost service: budgeted expenses and their variance

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::crud::{require_active, Crud, CrudService};
use super::Totals;
use crate::domain::money::{percentage, round2};
use crate::domain::{Cost, CostCompletion, CostCreate, CostStatus, CostUpdate};
use crate::error::DomainError;
use crate::repositories::{
    BuildingRepository, CostFilter, CostRepository, DateRange, FloorRepository, UnitRepository,
};

#[derive(Debug, Clone, Serialize)]
pub struct CostStatistics {
    pub building_id: Uuid,
    pub range: DateRange,
    pub total_costs: i64,
    pub total_estimated: Decimal,
    pub total_actual: Decimal,
    pub total_variance: Decimal,
    pub variance_percentage: Decimal,
    pub over_budget_count: i64,
    pub completed_count: i64,
    /// Estimated amounts per cost type.
    pub by_type: BTreeMap<String, Totals>,
    pub by_status: BTreeMap<String, i64>,
    pub by_priority: BTreeMap<String, i64>,
}

pub struct CostService {
    crud: Crud<Cost, CostFilter, CostRepository>,
    buildings: Arc<BuildingRepository>,
    floors: Arc<FloorRepository>,
    units: Arc<UnitRepository>,
}

impl CostService {
    pub fn new(
        costs: Arc<CostRepository>,
        buildings: Arc<BuildingRepository>,
        floors: Arc<FloorRepository>,
        units: Arc<UnitRepository>,
    ) -> Self {
        Self {
            crud: Crud::new(costs),
            buildings,
            floors,
            units,
        }
    }

    async fn check_links(&self, floor_id: Option<Uuid>, unit_id: Option<Uuid>) -> Result<(), DomainError> {
        if let Some(id) = floor_id {
            require_active(self.floors.as_ref(), id).await?;
        }
        if let Some(id) = unit_id {
            require_active(self.units.as_ref(), id).await?;
        }
        Ok(())
    }

    pub async fn complete(
        &self,
        id: Uuid,
        completion: CostCompletion,
        actor: &str,
    ) -> Result<Cost, DomainError> {
        let mut cost = self.crud.get(id).await?;
        cost.complete(completion, actor).inspect_err(|e| {
            warn!("Cost {} cannot be completed: {}", id, e);
        })?;
        let saved = self.crud.save(&cost).await?;
        info!(
            "Cost {} completed with actual amount {:?} (variance {:?})",
            id, saved.actual_amount, saved.variance_amount
        );
        Ok(saved)
    }

    pub async fn statistics(
        &self,
        building_id: Uuid,
        range: DateRange,
    ) -> Result<CostStatistics, DomainError> {
        require_active(self.buildings.as_ref(), building_id).await?;
        let costs = self
            .crud
            .all(&CostFilter {
                building_id: Some(building_id),
                planned_from: range.start,
                planned_to: range.end,
                ..Default::default()
            })
            .await?;

        let mut stats = CostStatistics {
            building_id,
            range,
            total_costs: costs.len() as i64,
            total_estimated: Decimal::ZERO,
            total_actual: Decimal::ZERO,
            total_variance: Decimal::ZERO,
            variance_percentage: Decimal::ZERO,
            over_budget_count: 0,
            completed_count: 0,
            by_type: BTreeMap::new(),
            by_status: BTreeMap::new(),
            by_priority: BTreeMap::new(),
        };

        for cost in &costs {
            *stats.by_status.entry(cost.status.to_string()).or_default() += 1;
            *stats.by_priority.entry(cost.priority.to_string()).or_default() += 1;
            if cost.status == CostStatus::Cancelled {
                continue;
            }
            stats.total_estimated += cost.estimated_amount;
            if let Some(actual) = cost.actual_amount {
                stats.total_actual += actual;
                stats.total_variance += actual - cost.estimated_amount;
            }
            if cost.is_over_budget() {
                stats.over_budget_count += 1;
            }
            if cost.status == CostStatus::Completed {
                stats.completed_count += 1;
            }
            stats
                .by_type
                .entry(cost.cost_type.to_string())
                .or_default()
                .add(cost.estimated_amount);
        }

        stats.total_estimated = round2(stats.total_estimated);
        stats.total_actual = round2(stats.total_actual);
        stats.total_variance = round2(stats.total_variance);
        stats.variance_percentage = percentage(stats.total_variance, stats.total_estimated);
        Ok(stats)
    }
}

#[async_trait]
impl CrudService for CostService {
    type Entity = Cost;
    type Filter = CostFilter;
    type Create = CostCreate;
    type Update = CostUpdate;
    type Repo = CostRepository;

    fn crud(&self) -> &Crud<Cost, CostFilter, CostRepository> {
        &self.crud
    }

    async fn create(&self, input: CostCreate, actor: &str) -> Result<Cost, DomainError> {
        let cost = Cost::new(input, actor)?;
        require_active(self.buildings.as_ref(), cost.building_id).await?;
        self.check_links(cost.floor_id, cost.unit_id).await?;
        self.crud.insert(cost).await
    }

    async fn update(&self, id: Uuid, changes: CostUpdate, actor: &str) -> Result<Cost, DomainError> {
        let mut cost = self.crud.get(id).await?;
        self.check_links(
            changes.floor_id.filter(|f| Some(*f) != cost.floor_id),
            changes.unit_id.filter(|u| Some(*u) != cost.unit_id),
        )
        .await?;
        cost.apply(changes, actor)?;
        self.crud.save(&cost).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Building, BuildingCreate, CostPriority, CostType};
    use crate::memory::repositories;
    use crate::repositories::Repository;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn input(building_id: Uuid, estimated: Decimal) -> CostCreate {
        CostCreate {
            building_id,
            floor_id: None,
            unit_id: None,
            title: "Roof repair".into(),
            description: String::new(),
            cost_type: CostType::Repair,
            priority: CostPriority::Urgent,
            status: CostStatus::Approved,
            planned_date: Utc::now(),
            actual_date: None,
            estimated_amount: estimated,
            actual_amount: None,
            budget_code: Some("CAPEX-24".into()),
            is_recurring: false,
            frequency_months: None,
            invoice_number: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_complete_and_statistics() {
        let repos = repositories();
        let building = Building::new(
            BuildingCreate {
                name: "Plaza".into(),
                address: None,
                total_floors: 2,
                year_built: None,
                description: None,
            },
            "alice",
        )
        .unwrap();
        repos.buildings.create(&building).await.unwrap();
        let svc = CostService::new(
            repos.costs.clone(),
            repos.buildings.clone(),
            repos.floors.clone(),
            repos.units.clone(),
        );

        let roof = svc.create(input(building.id, dec!(1000)), "alice").await.unwrap();
        svc.create(input(building.id, dec!(500)), "alice").await.unwrap();

        let done = svc
            .complete(
                roof.id,
                CostCompletion {
                    actual_amount: dec!(1200),
                    completion_date: None,
                },
                "bob",
            )
            .await
            .unwrap();
        assert_eq!(done.variance_amount, Some(dec!(200)));

        let err = svc
            .complete(
                roof.id,
                CostCompletion {
                    actual_amount: dec!(1),
                    completion_date: None,
                },
                "bob",
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ALREADY_COMPLETED");

        let stats = svc.statistics(building.id, DateRange::default()).await.unwrap();
        assert_eq!(stats.total_costs, 2);
        assert_eq!(stats.total_estimated, dec!(1500));
        assert_eq!(stats.total_actual, dec!(1200));
        assert_eq!(stats.over_budget_count, 1);
        assert_eq!(stats.completed_count, 1);
        assert_eq!(stats.by_priority["urgent"], 2);
    }

    #[tokio::test]
    async fn test_cost_floor_must_exist() {
        let repos = repositories();
        let svc = CostService::new(
            repos.costs.clone(),
            repos.buildings.clone(),
            repos.floors.clone(),
            repos.units.clone(),
        );
        let building = Building::new(
            BuildingCreate {
                name: "Plaza".into(),
                address: None,
                total_floors: 2,
                year_built: None,
                description: None,
            },
            "alice",
        )
        .unwrap();
        repos.buildings.create(&building).await.unwrap();

        let mut with_floor = input(building.id, dec!(10));
        with_floor.floor_id = Some(Uuid::new_v4());
        let err = svc.create(with_floor, "alice").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { resource: "Floor", .. }));
    }
}
