//! Generic CRUD plumbing shared by every resource service

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{info, warn};
use uuid::Uuid;

use estate_shared::Pagination;

use crate::domain::{Entity, EntityFilter};
use crate::error::DomainError;
use crate::repositories::Repository;

/// Soft-delete aware operations over one repository.
pub struct Crud<T, F, R: ?Sized> {
    repo: Arc<R>,
    _marker: PhantomData<fn() -> (T, F)>,
}

impl<T, F, R: ?Sized> Clone for Crud<T, F, R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            _marker: PhantomData,
        }
    }
}

impl<T, F, R> Crud<T, F, R>
where
    T: Entity,
    F: EntityFilter<T>,
    R: Repository<T, F> + ?Sized,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            repo,
            _marker: PhantomData,
        }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Live record or `NotFound`.
    pub async fn get(&self, id: Uuid) -> Result<T, DomainError> {
        match self.repo.find_by_id(id).await? {
            Some(entity) if !entity.is_deleted() => Ok(entity),
            _ => Err(DomainError::not_found(T::KIND, id)),
        }
    }

    /// Record regardless of its deletion flag, or `NotFound`.
    pub async fn get_any(&self, id: Uuid) -> Result<T, DomainError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(T::KIND, id))
    }

    pub async fn list(&self, filter: &F, page: Pagination) -> Result<Vec<T>, DomainError> {
        self.repo.list(filter, page.normalized()).await
    }

    /// Every live record matching `filter`, for aggregations.
    pub async fn all(&self, filter: &F) -> Result<Vec<T>, DomainError> {
        self.repo.list(filter, Pagination::unbounded()).await
    }

    pub async fn list_deleted(&self, page: Pagination) -> Result<Vec<T>, DomainError> {
        self.repo.list_deleted(page.normalized()).await
    }

    pub async fn count(&self, include_deleted: bool) -> Result<i64, DomainError> {
        self.repo.count(include_deleted).await
    }

    pub async fn insert(&self, entity: T) -> Result<T, DomainError> {
        let created = self.repo.create(&entity).await?;
        info!("{} created: {}", T::KIND, created.id());
        Ok(created)
    }

    pub async fn save(&self, entity: &T) -> Result<T, DomainError> {
        self.repo.update(entity).await
    }

    /// Flag a live record as deleted.
    pub async fn soft_delete(&self, id: Uuid, actor: &str) -> Result<T, DomainError> {
        let entity = self.get_any(id).await?;
        self.soft_delete_entity(entity, actor).await
    }

    pub async fn soft_delete_entity(&self, mut entity: T, actor: &str) -> Result<T, DomainError> {
        if entity.is_deleted() {
            warn!("{} {} is already deleted", T::KIND, entity.id());
            return Err(DomainError::AlreadyDeleted {
                resource: T::KIND,
                id: entity.id().to_string(),
            });
        }
        entity.audit_mut().mark_deleted(actor);
        let deleted = self.repo.update(&entity).await?;
        info!("{} soft-deleted: {} by {}", T::KIND, deleted.id(), actor);
        Ok(deleted)
    }

    /// Clear the deletion flag of a soft-deleted record.
    pub async fn restore(&self, id: Uuid, actor: &str) -> Result<T, DomainError> {
        let entity = self.deleted(id).await?;
        self.restore_entity(entity, actor).await
    }

    /// A soft-deleted record, `NotDeleted` when it is live.
    pub async fn deleted(&self, id: Uuid) -> Result<T, DomainError> {
        let entity = self.get_any(id).await?;
        if !entity.is_deleted() {
            warn!("{} {} is not deleted", T::KIND, id);
            return Err(DomainError::NotDeleted {
                resource: T::KIND,
                id: id.to_string(),
            });
        }
        Ok(entity)
    }

    pub async fn restore_entity(&self, mut entity: T, actor: &str) -> Result<T, DomainError> {
        entity.audit_mut().restore(actor);
        let restored = self.repo.update(&entity).await?;
        info!("{} restored: {} by {}", T::KIND, restored.id(), actor);
        Ok(restored)
    }

    /// Remove the row for good. Soft-deleted rows may be purged too.
    pub async fn hard_delete(&self, id: Uuid) -> Result<(), DomainError> {
        if !self.repo.hard_delete(id).await? {
            return Err(DomainError::not_found(T::KIND, id));
        }
        info!("{} permanently deleted: {}", T::KIND, id);
        Ok(())
    }
}

/// Fail with `NotFound` unless `id` names a live record of `R`.
pub async fn require_active<T, F>(repo: &dyn Repository<T, F>, id: Uuid) -> Result<T, DomainError>
where
    T: Entity,
    F: EntityFilter<T>,
{
    match repo.find_by_id(id).await? {
        Some(entity) if !entity.is_deleted() => Ok(entity),
        _ => {
            warn!("Referenced {} {} does not exist", T::KIND, id);
            Err(DomainError::not_found(T::KIND, id))
        }
    }
}

/// The uniform surface every resource service exposes to the HTTP layer.
///
/// Only `create` and `update` are resource specific by default; services
/// override the lifecycle methods where deleting or restoring has side
/// effects.
#[async_trait]
pub trait CrudService: Send + Sync + 'static {
    type Entity: Entity;
    type Filter: EntityFilter<Self::Entity> + DeserializeOwned;
    type Create: DeserializeOwned + Send + 'static;
    type Update: DeserializeOwned + Send + 'static;
    type Repo: Repository<Self::Entity, Self::Filter> + ?Sized;

    fn crud(&self) -> &Crud<Self::Entity, Self::Filter, Self::Repo>;

    async fn create(&self, input: Self::Create, actor: &str) -> Result<Self::Entity, DomainError>;

    async fn update(
        &self,
        id: Uuid,
        changes: Self::Update,
        actor: &str,
    ) -> Result<Self::Entity, DomainError>;

    async fn get(&self, id: Uuid) -> Result<Self::Entity, DomainError> {
        self.crud().get(id).await
    }

    async fn list(
        &self,
        filter: &Self::Filter,
        page: Pagination,
    ) -> Result<Vec<Self::Entity>, DomainError> {
        self.crud().list(filter, page).await
    }

    async fn list_deleted(&self, page: Pagination) -> Result<Vec<Self::Entity>, DomainError> {
        self.crud().list_deleted(page).await
    }

    async fn count(&self, include_deleted: bool) -> Result<i64, DomainError> {
        self.crud().count(include_deleted).await
    }

    async fn soft_delete(&self, id: Uuid, actor: &str) -> Result<Self::Entity, DomainError> {
        self.crud().soft_delete(id, actor).await
    }

    async fn restore(&self, id: Uuid, actor: &str) -> Result<Self::Entity, DomainError> {
        self.crud().restore(id, actor).await
    }

    async fn hard_delete(&self, id: Uuid) -> Result<(), DomainError> {
        self.crud().hard_delete(id).await
    }
}
