//! Floor service

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use estate_shared::Pagination;

use super::crud::{require_active, Crud, CrudService};
use crate::domain::money::percentage;
use crate::domain::{Floor, FloorCreate, FloorUpdate};
use crate::error::DomainError;
use crate::repositories::{
    BuildingRepository, FloorFilter, FloorRepository, Repository, UnitFilter, UnitRepository,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FloorStats {
    pub floor_id: Uuid,
    pub number: i32,
    pub name: String,
    pub capacity: i32,
    pub total_units: i64,
    pub occupied_units: i64,
    pub vacant_units: i64,
    pub occupancy_rate: Decimal,
}

pub struct FloorService {
    crud: Crud<Floor, FloorFilter, FloorRepository>,
    buildings: Arc<BuildingRepository>,
    units: Arc<UnitRepository>,
}

impl FloorService {
    pub fn new(
        floors: Arc<FloorRepository>,
        buildings: Arc<BuildingRepository>,
        units: Arc<UnitRepository>,
    ) -> Self {
        Self {
            crud: Crud::new(floors),
            buildings,
            units,
        }
    }

    async fn ensure_number_free(
        &self,
        building_id: Uuid,
        number: i32,
        except: Option<Uuid>,
    ) -> Result<(), DomainError> {
        let filter = FloorFilter {
            building_id: Some(building_id),
            number: Some(number),
        };
        let taken = self
            .crud
            .all(&filter)
            .await?
            .into_iter()
            .any(|f| Some(f.id) != except);
        if taken {
            warn!("Floor {} already exists in building {}", number, building_id);
            return Err(DomainError::already_exists("Floor", "number", number));
        }
        Ok(())
    }

    /// Occupancy per floor of a live building, lowest floor first.
    pub async fn stats(&self, building_id: Uuid) -> Result<Vec<FloorStats>, DomainError> {
        require_active(self.buildings.as_ref(), building_id).await?;
        let mut floors = self
            .crud
            .all(&FloorFilter {
                building_id: Some(building_id),
                ..Default::default()
            })
            .await?;
        floors.sort_by_key(|f| f.number);

        let mut stats = Vec::with_capacity(floors.len());
        for floor in floors {
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
            let total_units = units.len() as i64;
            let occupied_units = units.iter().filter(|u| u.is_occupied).count() as i64;
            stats.push(FloorStats {
                floor_id: floor.id,
                number: floor.number,
                name: floor.name,
                capacity: floor.total_units,
                total_units,
                occupied_units,
                vacant_units: total_units - occupied_units,
                occupancy_rate: percentage(occupied_units.into(), total_units.into()),
            });
        }
        Ok(stats)
    }
}

#[async_trait]
impl CrudService for FloorService {
    type Entity = Floor;
    type Filter = FloorFilter;
    type Create = FloorCreate;
    type Update = FloorUpdate;
    type Repo = FloorRepository;

    fn crud(&self) -> &Crud<Floor, FloorFilter, FloorRepository> {
        &self.crud
    }

    async fn create(&self, input: FloorCreate, actor: &str) -> Result<Floor, DomainError> {
        let floor = Floor::new(input, actor)?;
        require_active(self.buildings.as_ref(), floor.building_id).await?;
        self.ensure_number_free(floor.building_id, floor.number, None)
            .await?;
        self.crud.insert(floor).await
    }

    async fn update(&self, id: Uuid, changes: FloorUpdate, actor: &str) -> Result<Floor, DomainError> {
        let mut floor = self.crud.get(id).await?;
        if let Some(number) = changes.number.filter(|n| *n != floor.number) {
            self.ensure_number_free(floor.building_id, number, Some(id))
                .await?;
        }
        floor.apply(changes, actor)?;
        self.crud.save(&floor).await
    }

    async fn restore(&self, id: Uuid, actor: &str) -> Result<Floor, DomainError> {
        let floor = self.crud.deleted(id).await?;
        require_active(self.buildings.as_ref(), floor.building_id).await?;
        self.ensure_number_free(floor.building_id, floor.number, Some(id))
            .await?;
        self.crud.restore_entity(floor, actor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Building, BuildingCreate, Unit};
    use crate::memory::MemoryRepository;
    use crate::repositories::BuildingFilter;

    async fn setup() -> (FloorService, Building) {
        let buildings = Arc::new(MemoryRepository::<Building, BuildingFilter>::new());
        let building = Building::new(
            BuildingCreate {
                name: "Tower".into(),
                address: None,
                total_floors: 3,
                year_built: None,
                description: None,
            },
            "alice",
        )
        .unwrap();
        buildings.create(&building)
            .await
            .unwrap();
        let svc = FloorService::new(
            Arc::new(MemoryRepository::<Floor, FloorFilter>::new()),
            buildings,
            Arc::new(MemoryRepository::<Unit, UnitFilter>::new()),
        );
        (svc, building)
    }

    fn input(building_id: Uuid, number: i32) -> FloorCreate {
        FloorCreate {
            building_id,
            number,
            name: format!("Floor {number}"),
            total_units: 4,
            description: None,
        }
    }

    #[tokio::test]
    async fn test_floor_requires_existing_building() {
        let (svc, _) = setup().await;
        let err = svc.create(input(Uuid::new_v4(), 1), "alice").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { resource: "Building", .. }));
    }

    #[tokio::test]
    async fn test_floor_number_unique_per_building() {
        let (svc, building) = setup().await;
        let first = svc.create(input(building.id, 1), "alice").await.unwrap();
        let err = svc.create(input(building.id, 1), "alice").await.unwrap_err();
        assert!(matches!(err, DomainError::AlreadyExists { field: "number", .. }));

        let second = svc.create(input(building.id, 2), "alice").await.unwrap();
        let err = svc
            .update(
                second.id,
                FloorUpdate {
                    number: Some(first.number),
                    ..Default::default()
                },
                "alice",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::AlreadyExists { .. }));

        let stats = svc.stats(building.id).await.unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].number, 1);
        assert_eq!(stats[0].occupancy_rate, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_restore_rejects_number_reused_meanwhile() {
        let (svc, building) = setup().await;
        let original = svc.create(input(building.id, 1), "alice").await.unwrap();
        svc.soft_delete(original.id, "alice").await.unwrap();
        svc.create(input(building.id, 1), "bob").await.unwrap();

        let err = svc.restore(original.id, "alice").await.unwrap_err();
        assert!(matches!(err, DomainError::AlreadyExists { field: "number", .. }));
        assert!(svc.get(original.id).await.is_err());
    }
}
