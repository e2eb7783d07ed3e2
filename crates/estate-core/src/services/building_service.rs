//! Building service

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use estate_shared::Pagination;

use super::crud::{Crud, CrudService};
use crate::domain::money::percentage;
use crate::domain::{Building, BuildingCreate, BuildingUpdate, Floor};
use crate::error::DomainError;
use crate::repositories::{
    BuildingFilter, BuildingRepository, FloorFilter, FloorRepository, Repository, UnitFilter,
    UnitRepository,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildingStats {
    pub total_buildings: i64,
    pub total_floors: i64,
    pub total_units: i64,
    pub occupied_units: i64,
    pub vacant_units: i64,
    pub occupancy_rate: Decimal,
}

pub struct BuildingService {
    crud: Crud<Building, BuildingFilter, BuildingRepository>,
    floors: Arc<FloorRepository>,
    units: Arc<UnitRepository>,
}

impl BuildingService {
    pub fn new(
        buildings: Arc<BuildingRepository>,
        floors: Arc<FloorRepository>,
        units: Arc<UnitRepository>,
    ) -> Self {
        Self {
            crud: Crud::new(buildings),
            floors,
            units,
        }
    }

    /// Live floors of a live building, lowest number first.
    pub async fn floors(&self, building_id: Uuid, page: Pagination) -> Result<Vec<Floor>, DomainError> {
        self.crud.get(building_id).await?;
        let filter = FloorFilter {
            building_id: Some(building_id),
            ..Default::default()
        };
        let mut floors = self.floors.list(&filter, page.normalized()).await?;
        floors.sort_by_key(|f| f.number);
        Ok(floors)
    }

    pub async fn stats(&self) -> Result<BuildingStats, DomainError> {
        let total_buildings = self.crud.count(false).await?;
        let total_floors = self.floors.count(false).await?;
        let units = self
            .units
            .list(&UnitFilter::default(), Pagination::unbounded())
            .await?;
        let total_units = units.len() as i64;
        let occupied_units = units.iter().filter(|u| u.is_occupied).count() as i64;

        Ok(BuildingStats {
            total_buildings,
            total_floors,
            total_units,
            occupied_units,
            vacant_units: total_units - occupied_units,
            occupancy_rate: percentage(occupied_units.into(), total_units.into()),
        })
    }
}

#[async_trait]
impl CrudService for BuildingService {
    type Entity = Building;
    type Filter = BuildingFilter;
    type Create = BuildingCreate;
    type Update = BuildingUpdate;
    type Repo = BuildingRepository;

    fn crud(&self) -> &Crud<Building, BuildingFilter, BuildingRepository> {
        &self.crud
    }

    async fn create(&self, input: BuildingCreate, actor: &str) -> Result<Building, DomainError> {
        let building = Building::new(input, actor)?;
        self.crud.insert(building).await
    }

    async fn update(
        &self,
        id: Uuid,
        changes: BuildingUpdate,
        actor: &str,
    ) -> Result<Building, DomainError> {
        let mut building = self.crud.get(id).await?;
        building.apply(changes, actor)?;
        self.crud.save(&building).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRepository;

    fn service() -> BuildingService {
        BuildingService::new(
            Arc::new(MemoryRepository::<Building, BuildingFilter>::new()),
            Arc::new(MemoryRepository::<Floor, FloorFilter>::new()),
            Arc::new(MemoryRepository::<crate::domain::Unit, UnitFilter>::new()),
        )
    }

    fn input(name: &str) -> BuildingCreate {
        BuildingCreate {
            name: name.into(),
            address: None,
            total_floors: 5,
            year_built: None,
            description: None,
        }
    }

    #[tokio::test]
    async fn test_soft_delete_lifecycle() {
        let svc = service();
        let b = svc.create(input("Tower A"), "alice").await.unwrap();

        assert_eq!(svc.get(b.id).await.unwrap().name, "Tower A");

        let deleted = svc.soft_delete(b.id, "bob").await.unwrap();
        assert!(deleted.audit.is_deleted);
        assert!(matches!(svc.get(b.id).await, Err(DomainError::NotFound { .. })));
        assert!(svc
            .list(&BuildingFilter::default(), Pagination::default())
            .await
            .unwrap()
            .is_empty());
        assert_eq!(svc.list_deleted(Pagination::default()).await.unwrap().len(), 1);

        assert!(matches!(
            svc.soft_delete(b.id, "bob").await,
            Err(DomainError::AlreadyDeleted { .. })
        ));

        let restored = svc.restore(b.id, "carol").await.unwrap();
        assert!(!restored.audit.is_deleted);
        assert!(matches!(
            svc.restore(b.id, "carol").await,
            Err(DomainError::NotDeleted { .. })
        ));

        svc.hard_delete(b.id).await.unwrap();
        assert!(matches!(svc.get(b.id).await, Err(DomainError::NotFound { .. })));
        assert!(matches!(
            svc.hard_delete(b.id).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_paginated() {
        let svc = service();
        for name in ["One", "Two", "Three"] {
            svc.create(input(name), "alice").await.unwrap();
        }
        let all = svc
            .list(&BuildingFilter::default(), Pagination::default())
            .await
            .unwrap();
        let names: Vec<_> = all.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["Three", "Two", "One"]);

        let page = svc
            .list(&BuildingFilter::default(), Pagination::new(1, 1))
            .await
            .unwrap();
        assert_eq!(page[0].name, "Two");

        let found = svc
            .list(
                &BuildingFilter {
                    search: Some("thr".into()),
                },
                Pagination::default(),
            )
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(svc.count(false).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_update_missing_building() {
        let svc = service();
        let err = svc
            .update(Uuid::new_v4(), BuildingUpdate::default(), "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { resource: "Building", .. }));
    }
}
