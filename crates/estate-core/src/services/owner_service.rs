//! Owner service

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use estate_shared::Pagination;

use super::crud::{Crud, CrudService};
use crate::domain::money::round2;
use crate::domain::{ChargeStatus, Owner, OwnerCreate, OwnerUpdate, Unit};
use crate::error::DomainError;
use crate::repositories::{
    ChargeFilter, ChargeRepository, OwnerFilter, OwnerRepository, Repository, UnitFilter,
    UnitRepository,
};

/// An owner with their units and what they have been billed.
#[derive(Debug, Clone, Serialize)]
pub struct OwnerDetails {
    #[serde(flatten)]
    pub owner: Owner,
    pub units: Vec<Unit>,
    pub total_charged: Decimal,
    pub total_paid: Decimal,
    pub balance_due: Decimal,
}

pub struct OwnerService {
    crud: Crud<Owner, OwnerFilter, OwnerRepository>,
    units: Arc<UnitRepository>,
    charges: Arc<dyn ChargeRepository>,
}

impl OwnerService {
    pub fn new(
        owners: Arc<OwnerRepository>,
        units: Arc<UnitRepository>,
        charges: Arc<dyn ChargeRepository>,
    ) -> Self {
        Self {
            crud: Crud::new(owners),
            units,
            charges,
        }
    }

    async fn ensure_identification_free(
        &self,
        identification_number: &str,
        except: Option<Uuid>,
    ) -> Result<(), DomainError> {
        let filter = OwnerFilter {
            identification_number: Some(identification_number.to_string()),
            ..Default::default()
        };
        let taken = self
            .crud
            .all(&filter)
            .await?
            .into_iter()
            .any(|o| Some(o.id) != except);
        if taken {
            warn!("Owner identification number {} already registered", identification_number);
            return Err(DomainError::already_exists(
                "Owner",
                "identification_number",
                identification_number,
            ));
        }
        Ok(())
    }

    pub async fn details(&self, id: Uuid) -> Result<OwnerDetails, DomainError> {
        let owner = self.crud.get(id).await?;
        let units = self
            .units
            .list(
                &UnitFilter {
                    owner_id: Some(id),
                    ..Default::default()
                },
                Pagination::unbounded(),
            )
            .await?;
        let charges = self
            .charges
            .list(
                &ChargeFilter {
                    owner_id: Some(id),
                    ..Default::default()
                },
                Pagination::unbounded(),
            )
            .await?;

        let billable: Vec<_> = charges
            .iter()
            .filter(|c| c.status != ChargeStatus::Cancelled)
            .collect();
        Ok(OwnerDetails {
            owner,
            units,
            total_charged: round2(billable.iter().map(|c| c.total_amount()).sum()),
            total_paid: round2(billable.iter().map(|c| c.amount_paid).sum()),
            balance_due: round2(billable.iter().map(|c| c.balance_due()).sum()),
        })
    }
}

#[async_trait]
impl CrudService for OwnerService {
    type Entity = Owner;
    type Filter = OwnerFilter;
    type Create = OwnerCreate;
    type Update = OwnerUpdate;
    type Repo = OwnerRepository;

    fn crud(&self) -> &Crud<Owner, OwnerFilter, OwnerRepository> {
        &self.crud
    }

    async fn create(&self, input: OwnerCreate, actor: &str) -> Result<Owner, DomainError> {
        let owner = Owner::new(input, actor)?;
        self.ensure_identification_free(&owner.identification_number, None)
            .await?;
        self.crud.insert(owner).await
    }

    async fn update(&self, id: Uuid, changes: OwnerUpdate, actor: &str) -> Result<Owner, DomainError> {
        let mut owner = self.crud.get(id).await?;
        if let Some(number) = changes
            .identification_number
            .as_deref()
            .map(str::trim)
            .filter(|n| *n != owner.identification_number)
        {
            self.ensure_identification_free(number, Some(id)).await?;
        }
        owner.apply(changes, actor)?;
        self.crud.save(&owner).await
    }

    async fn restore(&self, id: Uuid, actor: &str) -> Result<Owner, DomainError> {
        let owner = self.crud.deleted(id).await?;
        self.ensure_identification_free(&owner.identification_number, Some(id))
            .await?;
        self.crud.restore_entity(owner, actor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OwnerStatus, OwnerType};
    use crate::memory::repositories;

    fn input(id_number: &str) -> OwnerCreate {
        OwnerCreate {
            owner_type: OwnerType::Company,
            status: OwnerStatus::Active,
            name: "Acme Holdings".into(),
            phone: "+1 555 0199".into(),
            alternative_phone: None,
            emergency_contact_name: None,
            emergency_contact_phone: None,
            email: None,
            identification_number: id_number.into(),
            whatsapp: None,
            telegram: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_identification_number_is_unique() {
        let repos = repositories();
        let svc = OwnerService::new(repos.owners, repos.units, repos.charges);

        let first = svc.create(input("REG-1"), "alice").await.unwrap();
        let err = svc.create(input("REG-1"), "alice").await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::AlreadyExists { field: "identification_number", .. }
        ));

        let other = svc.create(input("REG-2"), "alice").await.unwrap();
        let err = svc
            .update(
                other.id,
                OwnerUpdate {
                    identification_number: Some("REG-1".into()),
                    ..Default::default()
                },
                "alice",
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "RESOURCE_ALREADY_EXISTS");

        let details = svc.details(first.id).await.unwrap();
        assert!(details.units.is_empty());
        assert_eq!(details.balance_due, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_restore_rejects_identification_taken_meanwhile() {
        let repos = repositories();
        let svc = OwnerService::new(repos.owners, repos.units, repos.charges);

        let original = svc.create(input("ID-777"), "alice").await.unwrap();
        svc.soft_delete(original.id, "alice").await.unwrap();
        svc.create(input("ID-777"), "bob").await.unwrap();

        let err = svc.restore(original.id, "alice").await.unwrap_err();
        assert_eq!(err.code(), "RESOURCE_ALREADY_EXISTS");

        let live = svc
            .list(
                &OwnerFilter {
                    identification_number: Some("ID-777".into()),
                    ..Default::default()
                },
                Pagination::default(),
            )
            .await
            .unwrap();
        assert_eq!(live.len(), 1);
    }
}
