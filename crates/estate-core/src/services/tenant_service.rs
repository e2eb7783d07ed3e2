//! Tenant service: leases and unit occupancy

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use estate_shared::constants::DEFAULT_ACTOR;

use super::crud::{require_active, Crud, CrudService};
use crate::domain::{Tenant, TenantCreate, TenantUpdate};
use crate::error::DomainError;
use crate::repositories::{Repository, TenantFilter, TenantRepository, UnitRepository};

/// Body of `POST /tenants/{id}/extend-lease`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LeaseExtension {
    pub new_end_date: NaiveDate,
}

pub struct TenantService {
    crud: Crud<Tenant, TenantFilter, TenantRepository>,
    units: Arc<UnitRepository>,
}

impl TenantService {
    pub fn new(tenants: Arc<TenantRepository>, units: Arc<UnitRepository>) -> Self {
        Self {
            crud: Crud::new(tenants),
            units,
        }
    }

    async fn tenants_of(&self, unit_id: Uuid) -> Result<Vec<Tenant>, DomainError> {
        self.crud
            .all(&TenantFilter {
                unit_id: Some(unit_id),
                ..Default::default()
            })
            .await
    }

    async fn ensure_identification_free(
        &self,
        identification_number: &str,
        except: Option<Uuid>,
    ) -> Result<(), DomainError> {
        let filter = TenantFilter {
            identification_number: Some(identification_number.to_string()),
            ..Default::default()
        };
        let taken = self
            .crud
            .all(&filter)
            .await?
            .into_iter()
            .any(|t| Some(t.id) != except);
        if taken {
            warn!("Tenant identification number {} already registered", identification_number);
            return Err(DomainError::already_exists(
                "Tenant",
                "identification_number",
                identification_number,
            ));
        }
        Ok(())
    }

    /// No other live tenant of the unit may hold an overlapping lease.
    async fn ensure_available(
        &self,
        unit_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        except: Option<Uuid>,
    ) -> Result<(), DomainError> {
        let clash = self
            .tenants_of(unit_id)
            .await?
            .into_iter()
            .find(|t| Some(t.id) != except && t.overlaps(start, end));
        if let Some(other) = clash {
            warn!(
                "Unit {} is leased to tenant {} between {} and {}",
                unit_id, other.id, other.lease_start_date, other.lease_end_date
            );
            return Err(DomainError::rule(
                "UNIT_NOT_AVAILABLE",
                format!(
                    "Unit {} is already leased from {} to {}",
                    unit_id, other.lease_start_date, other.lease_end_date
                ),
            ));
        }
        Ok(())
    }

    async fn set_unit_occupied(&self, unit_id: Uuid, occupied: bool, actor: &str) -> Result<(), DomainError> {
        if let Some(mut unit) = self.units.find_by_id(unit_id).await? {
            if unit.audit.is_deleted || unit.is_occupied == occupied {
                return Ok(());
            }
            unit.set_occupied(occupied, actor);
            self.units.update(&unit).await?;
            info!("Unit {} occupancy set to {}", unit_id, occupied);
        }
        Ok(())
    }

    async fn vacate_if_empty(&self, unit_id: Uuid, actor: &str) -> Result<(), DomainError> {
        if self.tenants_of(unit_id).await?.is_empty() {
            self.set_unit_occupied(unit_id, false, actor).await?;
        }
        Ok(())
    }

    pub async fn extend_lease(
        &self,
        id: Uuid,
        extension: LeaseExtension,
        actor: &str,
    ) -> Result<Tenant, DomainError> {
        let mut tenant = self.crud.get(id).await?;
        let new_end = extension.new_end_date;
        if new_end <= tenant.lease_end_date {
            warn!("Lease extension for tenant {} does not move the end date forward", id);
            return Err(DomainError::rule(
                "INVALID_LEASE_EXTENSION",
                format!(
                    "New lease end {} must be after the current end {}",
                    new_end, tenant.lease_end_date
                ),
            ));
        }
        self.ensure_available(tenant.unit_id, tenant.lease_start_date, new_end, Some(id))
            .await?;

        tenant.lease_end_date = new_end;
        tenant.audit.touch(actor);
        let saved = self.crud.save(&tenant).await?;
        info!("Lease of tenant {} extended to {}", id, new_end);
        Ok(saved)
    }
}

#[async_trait]
impl CrudService for TenantService {
    type Entity = Tenant;
    type Filter = TenantFilter;
    type Create = TenantCreate;
    type Update = TenantUpdate;
    type Repo = TenantRepository;

    fn crud(&self) -> &Crud<Tenant, TenantFilter, TenantRepository> {
        &self.crud
    }

    async fn create(&self, input: TenantCreate, actor: &str) -> Result<Tenant, DomainError> {
        let tenant = Tenant::new(input, actor)?;
        require_active(self.units.as_ref(), tenant.unit_id).await?;
        self.ensure_identification_free(&tenant.identification_number, None)
            .await?;
        self.ensure_available(
            tenant.unit_id,
            tenant.lease_start_date,
            tenant.lease_end_date,
            None,
        )
        .await?;

        let created = self.crud.insert(tenant).await?;
        self.set_unit_occupied(created.unit_id, true, actor).await?;
        Ok(created)
    }

    async fn update(&self, id: Uuid, changes: TenantUpdate, actor: &str) -> Result<Tenant, DomainError> {
        let mut tenant = self.crud.get(id).await?;
        if let Some(number) = changes
            .identification_number
            .as_deref()
            .map(str::trim)
            .filter(|n| *n != tenant.identification_number)
        {
            self.ensure_identification_free(number, Some(id)).await?;
        }
        if let Some(end) = changes.lease_end_date.filter(|e| *e > tenant.lease_end_date) {
            self.ensure_available(tenant.unit_id, tenant.lease_start_date, end, Some(id))
                .await?;
        }
        tenant.apply(changes, actor)?;
        self.crud.save(&tenant).await
    }

    async fn soft_delete(&self, id: Uuid, actor: &str) -> Result<Tenant, DomainError> {
        let deleted = self.crud.soft_delete(id, actor).await?;
        self.vacate_if_empty(deleted.unit_id, actor).await?;
        Ok(deleted)
    }

    async fn restore(&self, id: Uuid, actor: &str) -> Result<Tenant, DomainError> {
        let tenant = self.crud.deleted(id).await?;
        require_active(self.units.as_ref(), tenant.unit_id).await?;
        self.ensure_identification_free(&tenant.identification_number, Some(id))
            .await?;
        self.ensure_available(
            tenant.unit_id,
            tenant.lease_start_date,
            tenant.lease_end_date,
            Some(id),
        )
        .await?;
        let restored = self.crud.restore_entity(tenant, actor).await?;
        self.set_unit_occupied(restored.unit_id, true, actor).await?;
        Ok(restored)
    }

    async fn hard_delete(&self, id: Uuid) -> Result<(), DomainError> {
        let tenant = self.crud.get_any(id).await?;
        self.crud.hard_delete(id).await?;
        if !tenant.audit.is_deleted {
            self.vacate_if_empty(tenant.unit_id, DEFAULT_ACTOR).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TenantStatus, TenantType, Unit, UnitCreate, UnitStatus, UnitType};
    use crate::memory::repositories;
    use crate::repositories::Repositories;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    async fn unit(repos: &Repositories) -> Unit {
        let unit = Unit::new(
            UnitCreate {
                floor_id: Uuid::new_v4(),
                owner_id: None,
                unit_number: "12B".into(),
                unit_type: UnitType::Residential,
                status: UnitStatus::Vacant,
                area: dec!(64),
                has_parking: true,
                parking_space_number: Some("P-12".into()),
                resident_count: 0,
                constant_extra_charge: Decimal::ZERO,
            },
            "alice",
        )
        .unwrap();
        repos.units.create(&unit).await.unwrap()
    }

    fn input(unit_id: Uuid, id_number: &str, start: NaiveDate, end: NaiveDate) -> TenantCreate {
        TenantCreate {
            unit_id,
            tenant_type: TenantType::Individual,
            status: TenantStatus::Active,
            name: "Sam Lee".into(),
            phone: "+61 2 9999 0000".into(),
            emergency_contact_name: None,
            emergency_contact_phone: None,
            emergency_contact_relation: None,
            email: None,
            identification_number: id_number.into(),
            whatsapp: None,
            telegram: None,
            vehicle_info: None,
            occupant_count: 2,
            lease_start_date: start,
            lease_end_date: end,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_lease_overlap_and_occupancy() {
        let repos = repositories();
        let unit = unit(&repos).await;
        let svc = TenantService::new(repos.tenants.clone(), repos.units.clone());
        let today = Utc::now().date_naive();

        let first = svc
            .create(input(unit.id, "T-1", today, today + Duration::days(365)), "alice")
            .await
            .unwrap();
        let stored = repos.units.find_by_id(unit.id).await.unwrap().unwrap();
        assert!(stored.is_occupied);
        assert_eq!(stored.status, UnitStatus::Occupied);

        let err = svc
            .create(
                input(unit.id, "T-2", today + Duration::days(100), today + Duration::days(500)),
                "alice",
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNIT_NOT_AVAILABLE");

        let later = svc
            .create(
                input(unit.id, "T-3", today + Duration::days(366), today + Duration::days(700)),
                "alice",
            )
            .await
            .unwrap();

        let err = svc
            .extend_lease(
                first.id,
                LeaseExtension {
                    new_end_date: today + Duration::days(400),
                },
                "alice",
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNIT_NOT_AVAILABLE");

        svc.soft_delete(first.id, "alice").await.unwrap();
        assert!(repos.units.find_by_id(unit.id).await.unwrap().unwrap().is_occupied);

        svc.soft_delete(later.id, "alice").await.unwrap();
        let stored = repos.units.find_by_id(unit.id).await.unwrap().unwrap();
        assert!(!stored.is_occupied);

        svc.restore(first.id, "alice").await.unwrap();
        assert!(repos.units.find_by_id(unit.id).await.unwrap().unwrap().is_occupied);
    }

    #[tokio::test]
    async fn test_lease_starting_on_previous_end_day_clashes() {
        let repos = repositories();
        let unit = unit(&repos).await;
        let svc = TenantService::new(repos.tenants.clone(), repos.units.clone());
        let today = Utc::now().date_naive();
        let handover = today + Duration::days(150);
        svc.create(input(unit.id, "T-1", today, handover), "alice")
            .await
            .unwrap();

        let err = svc
            .create(
                input(unit.id, "T-2", handover, handover + Duration::days(180)),
                "alice",
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNIT_NOT_AVAILABLE");

        svc.create(
            input(
                unit.id,
                "T-2",
                handover + Duration::days(1),
                handover + Duration::days(180),
            ),
            "alice",
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_restore_rejects_identification_taken_meanwhile() {
        let repos = repositories();
        let first_unit = unit(&repos).await;
        let second_unit = unit(&repos).await;
        let svc = TenantService::new(repos.tenants.clone(), repos.units.clone());
        let today = Utc::now().date_naive();

        let original = svc
            .create(input(first_unit.id, "T-42", today, today + Duration::days(90)), "alice")
            .await
            .unwrap();
        svc.soft_delete(original.id, "alice").await.unwrap();
        svc.create(input(second_unit.id, "T-42", today, today + Duration::days(90)), "alice")
            .await
            .unwrap();

        let err = svc.restore(original.id, "alice").await.unwrap_err();
        assert_eq!(err.code(), "RESOURCE_ALREADY_EXISTS");
        assert!(svc.get(original.id).await.is_err());
        let stored = repos.units.find_by_id(first_unit.id).await.unwrap().unwrap();
        assert!(!stored.is_occupied);
    }

    #[tokio::test]
    async fn test_extend_lease_must_move_forward() {
        let repos = repositories();
        let unit = unit(&repos).await;
        let svc = TenantService::new(repos.tenants.clone(), repos.units.clone());
        let today = Utc::now().date_naive();
        let tenant = svc
            .create(input(unit.id, "T-9", today, today + Duration::days(30)), "alice")
            .await
            .unwrap();

        let err = svc
            .extend_lease(
                tenant.id,
                LeaseExtension {
                    new_end_date: today + Duration::days(10),
                },
                "alice",
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_LEASE_EXTENSION");

        let extended = svc
            .extend_lease(
                tenant.id,
                LeaseExtension {
                    new_end_date: today + Duration::days(90),
                },
                "alice",
            )
            .await
            .unwrap();
        assert_eq!(extended.lease_end_date, today + Duration::days(90));
    }

    #[tokio::test]
    async fn test_tenant_needs_live_unit() {
        let repos = repositories();
        let svc = TenantService::new(repos.tenants.clone(), repos.units.clone());
        let today = Utc::now().date_naive();
        let err = svc
            .create(input(Uuid::new_v4(), "T-1", today, today + Duration::days(30)), "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { resource: "Unit", .. }));
    }
}
