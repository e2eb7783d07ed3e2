//! Unit service

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use estate_shared::Pagination;

use super::crud::{require_active, Crud, CrudService};
use crate::domain::money::round2;
use crate::domain::{ChargeStatus, Floor, Unit, UnitCreate, UnitUpdate};
use crate::error::DomainError;
use crate::repositories::{
    ChargeFilter, ChargeRepository, FloorRepository, OwnerRepository, Repository, TenantFilter,
    TenantRepository, UnitFilter, UnitRepository,
};

/// A unit with the names and balances shown on its detail page.
#[derive(Debug, Clone, Serialize)]
pub struct UnitDetails {
    #[serde(flatten)]
    pub unit: Unit,
    pub owner_name: Option<String>,
    pub tenant_name: Option<String>,
    pub total_charged: Decimal,
    pub balance_due: Decimal,
}

pub struct UnitService {
    crud: Crud<Unit, UnitFilter, UnitRepository>,
    floors: Arc<FloorRepository>,
    owners: Arc<OwnerRepository>,
    tenants: Arc<TenantRepository>,
    charges: Arc<dyn ChargeRepository>,
}

impl UnitService {
    pub fn new(
        units: Arc<UnitRepository>,
        floors: Arc<FloorRepository>,
        owners: Arc<OwnerRepository>,
        tenants: Arc<TenantRepository>,
        charges: Arc<dyn ChargeRepository>,
    ) -> Self {
        Self {
            crud: Crud::new(units),
            floors,
            owners,
            tenants,
            charges,
        }
    }

    async fn units_on(&self, floor_id: Uuid) -> Result<Vec<Unit>, DomainError> {
        self.crud
            .all(&UnitFilter {
                floor_id: Some(floor_id),
                ..Default::default()
            })
            .await
    }

    async fn ensure_number_free(
        &self,
        floor_id: Uuid,
        unit_number: &str,
        except: Option<Uuid>,
    ) -> Result<(), DomainError> {
        let taken = self
            .units_on(floor_id)
            .await?
            .iter()
            .any(|u| u.unit_number == unit_number && Some(u.id) != except);
        if taken {
            warn!("Unit {} already exists on floor {}", unit_number, floor_id);
            return Err(DomainError::already_exists("Unit", "unit_number", unit_number));
        }
        Ok(())
    }

    async fn ensure_capacity(&self, floor: &Floor) -> Result<(), DomainError> {
        let used = self.units_on(floor.id).await?.len() as i64;
        if used >= i64::from(floor.total_units) {
            warn!("Floor {} is full ({} units)", floor.id, used);
            return Err(DomainError::rule(
                "FLOOR_FULL",
                format!(
                    "Floor {} already holds its maximum of {} units",
                    floor.number, floor.total_units
                ),
            ));
        }
        Ok(())
    }

    pub async fn details(&self, id: Uuid) -> Result<UnitDetails, DomainError> {
        let unit = self.crud.get(id).await?;

        let owner_name = match unit.owner_id {
            Some(owner_id) => self
                .owners
                .find_by_id(owner_id)
                .await?
                .filter(|o| !o.audit.is_deleted)
                .map(|o| o.name),
            None => None,
        };

        let tenant_name = self
            .tenants
            .list(
                &TenantFilter {
                    unit_id: Some(id),
                    ..Default::default()
                },
                Pagination::unbounded(),
            )
            .await?
            .into_iter()
            .find(|t| t.is_resident())
            .map(|t| t.name);

        let charges = self
            .charges
            .list(
                &ChargeFilter {
                    unit_id: Some(id),
                    ..Default::default()
                },
                Pagination::unbounded(),
            )
            .await?;
        let billable = charges
            .iter()
            .filter(|c| c.status != ChargeStatus::Cancelled);
        let total_charged = round2(billable.clone().map(|c| c.total_amount()).sum());
        let balance_due = round2(billable.map(|c| c.balance_due()).sum());

        Ok(UnitDetails {
            unit,
            owner_name,
            tenant_name,
            total_charged,
            balance_due,
        })
    }
}

#[async_trait]
impl CrudService for UnitService {
    type Entity = Unit;
    type Filter = UnitFilter;
    type Create = UnitCreate;
    type Update = UnitUpdate;
    type Repo = UnitRepository;

    fn crud(&self) -> &Crud<Unit, UnitFilter, UnitRepository> {
        &self.crud
    }

    async fn create(&self, input: UnitCreate, actor: &str) -> Result<Unit, DomainError> {
        let unit = Unit::new(input, actor)?;
        let floor = require_active(self.floors.as_ref(), unit.floor_id).await?;
        if let Some(owner_id) = unit.owner_id {
            require_active(self.owners.as_ref(), owner_id).await?;
        }
        self.ensure_number_free(unit.floor_id, &unit.unit_number, None)
            .await?;
        self.ensure_capacity(&floor).await?;
        self.crud.insert(unit).await
    }

    async fn update(&self, id: Uuid, changes: UnitUpdate, actor: &str) -> Result<Unit, DomainError> {
        let mut unit = self.crud.get(id).await?;
        if let Some(owner_id) = changes.owner_id.filter(|o| Some(*o) != unit.owner_id) {
            require_active(self.owners.as_ref(), owner_id).await?;
        }
        if let Some(number) = changes
            .unit_number
            .as_deref()
            .map(str::trim)
            .filter(|n| *n != unit.unit_number)
        {
            self.ensure_number_free(unit.floor_id, number, Some(id)).await?;
        }
        unit.apply(changes, actor)?;
        self.crud.save(&unit).await
    }

    async fn restore(&self, id: Uuid, actor: &str) -> Result<Unit, DomainError> {
        let unit = self.crud.deleted(id).await?;
        let floor = require_active(self.floors.as_ref(), unit.floor_id).await?;
        self.ensure_number_free(unit.floor_id, &unit.unit_number, Some(id))
            .await?;
        self.ensure_capacity(&floor).await?;
        self.crud.restore_entity(unit, actor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::repositories;
    use crate::repositories::Repositories;
    use crate::domain::{
        Building, BuildingCreate, Charge, ChargeCreate, ChargeFrequency, ChargeType,
        FloorCreate, UnitStatus, UnitType,
    };
    use chrono::Utc;
    use rust_decimal_macros::dec;

    async fn floor_with_capacity(repos: &Repositories, capacity: i32) -> Floor {
        let building = Building::new(
            BuildingCreate {
                name: "Tower".into(),
                address: None,
                total_floors: 1,
                year_built: None,
                description: None,
            },
            "alice",
        )
        .unwrap();
        repos.buildings.create(&building).await.unwrap();
        let floor = Floor::new(
            FloorCreate {
                building_id: building.id,
                number: 1,
                name: "First".into(),
                total_units: capacity,
                description: None,
            },
            "alice",
        )
        .unwrap();
        repos.floors.create(&floor).await.unwrap()
    }

    fn service(repos: &Repositories) -> UnitService {
        UnitService::new(
            repos.units.clone(),
            repos.floors.clone(),
            repos.owners.clone(),
            repos.tenants.clone(),
            repos.charges.clone(),
        )
    }

    fn input(floor_id: Uuid, number: &str) -> UnitCreate {
        UnitCreate {
            floor_id,
            owner_id: None,
            unit_number: number.into(),
            unit_type: UnitType::Residential,
            status: UnitStatus::Vacant,
            area: dec!(70),
            has_parking: false,
            parking_space_number: None,
            resident_count: 0,
            constant_extra_charge: Decimal::ZERO,
        }
    }

    #[tokio::test]
    async fn test_floor_capacity_enforced() {
        let repos = repositories();
        let floor = floor_with_capacity(&repos, 2).await;
        let svc = service(&repos);

        svc.create(input(floor.id, "101"), "alice").await.unwrap();
        let second = svc.create(input(floor.id, "102"), "alice").await.unwrap();
        let err = svc.create(input(floor.id, "103"), "alice").await.unwrap_err();
        assert_eq!(err.code(), "FLOOR_FULL");

        svc.soft_delete(second.id, "alice").await.unwrap();
        let third = svc.create(input(floor.id, "103"), "alice").await.unwrap();
        assert_eq!(third.unit_number, "103");

        let err = svc.restore(second.id, "alice").await.unwrap_err();
        assert_eq!(err.code(), "FLOOR_FULL");
    }

    #[tokio::test]
    async fn test_unit_number_unique_and_owner_checked() {
        let repos = repositories();
        let floor = floor_with_capacity(&repos, 10).await;
        let svc = service(&repos);

        svc.create(input(floor.id, "101"), "alice").await.unwrap();
        let err = svc.create(input(floor.id, "101"), "alice").await.unwrap_err();
        assert!(matches!(err, DomainError::AlreadyExists { field: "unit_number", .. }));

        let mut with_owner = input(floor.id, "102");
        with_owner.owner_id = Some(Uuid::new_v4());
        let err = svc.create(with_owner, "alice").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { resource: "Owner", .. }));
    }

    #[tokio::test]
    async fn test_restore_rejects_unit_number_reused_meanwhile() {
        let repos = repositories();
        let floor = floor_with_capacity(&repos, 10).await;
        let svc = service(&repos);

        let original = svc.create(input(floor.id, "101"), "alice").await.unwrap();
        svc.soft_delete(original.id, "alice").await.unwrap();
        svc.create(input(floor.id, "101"), "bob").await.unwrap();

        let err = svc.restore(original.id, "alice").await.unwrap_err();
        assert!(matches!(err, DomainError::AlreadyExists { field: "unit_number", .. }));
    }

    #[tokio::test]
    async fn test_details_sum_unit_charges() {
        let repos = repositories();
        let floor = floor_with_capacity(&repos, 10).await;
        let svc = service(&repos);
        let unit = svc.create(input(floor.id, "101"), "alice").await.unwrap();

        let charge = Charge::new(
            ChargeCreate {
                building_id: floor.building_id,
                unit_id: Some(unit.id),
                owner_id: None,
                tenant_id: None,
                title: "Service fee".into(),
                description: String::new(),
                amount: dec!(200),
                charge_type: ChargeType::Maintenance,
                status: ChargeStatus::Pending,
                due_date: Utc::now(),
                frequency: ChargeFrequency::Monthly,
                recurring: false,
                generated_by: None,
                notes: None,
                tax_rate: dec!(10),
                is_taxable: true,
            },
            "alice",
        )
        .unwrap();
        repos.charges.create(&charge).await.unwrap();

        let details = svc.details(unit.id).await.unwrap();
        assert_eq!(details.total_charged, dec!(220));
        assert_eq!(details.balance_due, dec!(220));
        assert_eq!(details.owner_name, None);
        assert_eq!(details.tenant_name, None);
    }
}
