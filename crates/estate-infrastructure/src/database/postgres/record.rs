//! Row mapping shared by every PostgreSQL repository

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::query_builder::Separated;
use sqlx::{FromRow, Postgres};
use tracing::error;

use estate_core::domain::Entity;
use estate_core::error::DomainError;
use estate_shared::AuditFields;

/// Append the audit block columns to an entity column list.
macro_rules! with_audit {
    ($columns:literal) => {
        concat!(
            $columns,
            ", created_at, created_by, updated_at, updated_by, is_deleted, deleted_at, deleted_by"
        )
    };
}
pub(crate) use with_audit;

/// An entity stored in one table whose columns map one-to-one onto its
/// fields.
pub trait PgRecord: Entity {
    const TABLE: &'static str;
    /// Column list in bind order, `id` first and the audit block last.
    const COLUMNS: &'static str;

    type Row: for<'r> FromRow<'r, PgRow> + Send + Unpin;

    fn from_row(row: Self::Row) -> Result<Self, DomainError>;

    /// Bind every column of `COLUMNS`, in order.
    fn bind_values<'a>(&'a self, values: &mut Separated<'_, 'a, Postgres, &'static str>);
}

#[derive(Debug, FromRow)]
pub struct AuditRow {
    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
}

impl From<AuditRow> for AuditFields {
    fn from(row: AuditRow) -> Self {
        AuditFields {
            created_at: row.created_at,
            created_by: row.created_by,
            updated_at: row.updated_at,
            updated_by: row.updated_by,
            is_deleted: row.is_deleted,
            deleted_at: row.deleted_at,
            deleted_by: row.deleted_by,
        }
    }
}

pub fn bind_audit<'a>(audit: &'a AuditFields, values: &mut Separated<'_, 'a, Postgres, &'static str>) {
    values
        .push_bind(audit.created_at)
        .push_bind(&audit.created_by)
        .push_bind(audit.updated_at)
        .push_bind(&audit.updated_by)
        .push_bind(audit.is_deleted)
        .push_bind(audit.deleted_at)
        .push_bind(&audit.deleted_by);
}

/// Parse a TEXT status/type column.
pub fn decode<E>(value: &str, parse: fn(&str) -> Option<E>, column: &str) -> Result<E, DomainError> {
    parse(value).ok_or_else(|| {
        error!("Unexpected value '{}' in column {}", value, column);
        DomainError::DatabaseError(format!("unexpected value '{value}' in column {column}"))
    })
}

/// Translate a driver error, logging it first.
pub fn map_db_error(resource: &'static str, context: &str, e: sqlx::Error) -> DomainError {
    error!("Database error {} {}: {}", context, resource, e);
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => DomainError::already_exists(
            resource,
            "key",
            db.constraint().unwrap_or("unique constraint"),
        ),
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => DomainError::rule(
            "REFERENCE_VIOLATION",
            format!("{resource} references a record that does not exist"),
        ),
        _ => DomainError::DatabaseError(e.to_string()),
    }
}
