//! Domain errors

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("{resource} with id {id} not found")]
    NotFound { resource: &'static str, id: String },

    #[error("{resource} with {field} '{value}' already exists")]
    AlreadyExists {
        resource: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("{resource} {id} is already deleted")]
    AlreadyDeleted { resource: &'static str, id: String },

    #[error("{resource} {id} is not deleted")]
    NotDeleted { resource: &'static str, id: String },

    #[error("{detail}")]
    BusinessRule { code: &'static str, detail: String },

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Decimal, available: Decimal },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound { resource, id: id.to_string() }
    }

    pub fn already_exists(resource: &'static str, field: &'static str, value: impl ToString) -> Self {
        DomainError::AlreadyExists { resource, field, value: value.to_string() }
    }

    pub fn rule(code: &'static str, detail: impl Into<String>) -> Self {
        DomainError::BusinessRule { code, detail: detail.into() }
    }

    pub fn validation(detail: impl Into<String>) -> Self {
        DomainError::ValidationError(detail.into())
    }

    /// Stable machine-readable code, surfaced in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::NotFound { .. } => "RESOURCE_NOT_FOUND",
            DomainError::AlreadyExists { .. } => "RESOURCE_ALREADY_EXISTS",
            DomainError::AlreadyDeleted { .. } => "ALREADY_DELETED",
            DomainError::NotDeleted { .. } => "NOT_DELETED",
            DomainError::BusinessRule { code, .. } => code,
            DomainError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            DomainError::Conflict(_) => "CONFLICT",
            DomainError::ValidationError(_) => "VALIDATION_ERROR",
            DomainError::DatabaseError(_) => "DATABASE_ERROR",
            DomainError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(errors: validator::ValidationErrors) -> Self {
        DomainError::ValidationError(errors.to_string())
    }
}
