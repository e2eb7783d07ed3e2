//! Generic PostgreSQL repository over a `PgRecord` table

use std::marker::PhantomData;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use estate_core::domain::EntityFilter;
use estate_core::error::DomainError;
use estate_core::repositories::Repository;
use estate_shared::Pagination;

use super::filters::SqlFilter;
use super::record::{map_db_error, PgRecord};

pub struct PgRepository<T, F> {
    pub(crate) pool: PgPool,
    _marker: PhantomData<fn() -> (T, F)>,
}

impl<T, F> PgRepository<T, F> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _marker: PhantomData,
        }
    }
}

impl<T: PgRecord, F> PgRepository<T, F> {
    fn select() -> String {
        format!("SELECT {} FROM {}", T::COLUMNS, T::TABLE)
    }

    fn decode_all(rows: Vec<T::Row>) -> Result<Vec<T>, DomainError> {
        rows.into_iter().map(T::from_row).collect()
    }

    /// `INSERT` of every column, returning the stored row.
    pub(crate) fn insert_query(entity: &T) -> QueryBuilder<'_, Postgres> {
        let mut qb = QueryBuilder::new(format!(
            "INSERT INTO {} ({}) VALUES (",
            T::TABLE,
            T::COLUMNS
        ));
        {
            let mut values = qb.separated(", ");
            entity.bind_values(&mut values);
        }
        qb.push(") RETURNING ").push(T::COLUMNS);
        qb
    }

    /// Whole-row `UPDATE` by id, returning the stored row. With a `guard`
    /// the row only matches while `column` still holds the given value.
    pub(crate) fn update_query<'a>(
        entity: &'a T,
        guard: Option<(&'static str, Decimal)>,
    ) -> QueryBuilder<'a, Postgres> {
        let mut qb = QueryBuilder::new(format!(
            "UPDATE {} SET ({}) = ROW(",
            T::TABLE,
            T::COLUMNS
        ));
        {
            let mut values = qb.separated(", ");
            entity.bind_values(&mut values);
        }
        qb.push(") WHERE id = ").push_bind(entity.id());
        if let Some((column, expected)) = guard {
            qb.push(" AND ").push(column).push(" = ").push_bind(expected);
        }
        qb.push(" RETURNING ").push(T::COLUMNS);
        qb
    }
}

#[async_trait]
impl<T, F> Repository<T, F> for PgRepository<T, F>
where
    T: PgRecord,
    F: EntityFilter<T> + SqlFilter,
{
    async fn find_by_id(&self, id: Uuid) -> Result<Option<T>, DomainError> {
        let sql = format!("{} WHERE id = $1", Self::select());
        let row: Option<T::Row> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(T::KIND, "finding", e))?;
        row.map(T::from_row).transpose()
    }

    async fn list(&self, filter: &F, page: Pagination) -> Result<Vec<T>, DomainError> {
        let mut qb = QueryBuilder::new(Self::select());
        qb.push(" WHERE is_deleted = FALSE");
        filter.push_conditions(&mut qb);
        qb.push(" ORDER BY created_at DESC OFFSET ")
            .push_bind(page.offset())
            .push(" LIMIT ")
            .push_bind(page.limit());

        let rows: Vec<T::Row> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error(T::KIND, "listing", e))?;
        Self::decode_all(rows)
    }

    async fn list_deleted(&self, page: Pagination) -> Result<Vec<T>, DomainError> {
        let sql = format!(
            "{} WHERE is_deleted = TRUE ORDER BY deleted_at DESC OFFSET $1 LIMIT $2",
            Self::select()
        );
        let rows: Vec<T::Row> = sqlx::query_as(&sql)
            .bind(page.offset())
            .bind(page.limit())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error(T::KIND, "listing deleted", e))?;
        Self::decode_all(rows)
    }

    async fn count(&self, include_deleted: bool) -> Result<i64, DomainError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE ($1 OR is_deleted = FALSE)",
            T::TABLE
        );
        sqlx::query_scalar(&sql)
            .bind(include_deleted)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(T::KIND, "counting", e))
    }

    async fn create(&self, entity: &T) -> Result<T, DomainError> {
        let row: T::Row = Self::insert_query(entity)
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(T::KIND, "creating", e))?;
        info!("{} {} stored", T::KIND, entity.id());
        T::from_row(row)
    }

    async fn update(&self, entity: &T) -> Result<T, DomainError> {
        let row: Option<T::Row> = Self::update_query(entity, None)
            .build_query_as()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(T::KIND, "updating", e))?;
        match row {
            Some(row) => T::from_row(row),
            None => Err(DomainError::not_found(T::KIND, entity.id())),
        }
    }

    async fn hard_delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", T::TABLE);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_error(T::KIND, "deleting", e))?;
        Ok(result.rows_affected() > 0)
    }
}
