//! HTTP error mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};

use estate_core::DomainError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Template error: {0}")]
    Template(String),
}

/// Error body: `{"detail", "code", "metadata"}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
    pub code: String,
    pub metadata: Option<Value>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Domain(e) => match e {
                DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
                DomainError::AlreadyExists { .. } | DomainError::Conflict(_) => StatusCode::CONFLICT,
                DomainError::AlreadyDeleted { .. }
                | DomainError::NotDeleted { .. }
                | DomainError::BusinessRule { .. }
                | DomainError::InsufficientFunds { .. } => StatusCode::BAD_REQUEST,
                DomainError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
                DomainError::DatabaseError(_) | DomainError::InternalError(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Domain(e) => e.code(),
            ApiError::Template(_) => "TEMPLATE_ERROR",
        }
    }

    fn metadata(&self) -> Option<Value> {
        match self {
            ApiError::Domain(DomainError::NotFound { resource, id }) => {
                Some(json!({ "resource": resource, "id": id }))
            }
            ApiError::Domain(DomainError::AlreadyExists { resource, field, value }) => {
                Some(json!({ "resource": resource, "field": field, "value": value }))
            }
            ApiError::Domain(DomainError::InsufficientFunds { required, available }) => {
                Some(json!({ "required": required, "available": available }))
            }
            _ => None,
        }
    }

    fn detail(&self) -> String {
        match self {
            // Internal details stay in the logs.
            ApiError::Domain(DomainError::DatabaseError(_))
            | ApiError::Domain(DomainError::InternalError(_))
            | ApiError::Template(_) => "Internal server error".to_string(),
            ApiError::Domain(e) => e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{} {}: {}", status.as_u16(), self.code(), self);
        } else {
            warn!("{} {}: {}", status.as_u16(), self.code(), self);
        }

        let body = ErrorBody {
            detail: self.detail(),
            code: self.code().to_string(),
            metadata: self.metadata(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<handlebars::RenderError> for ApiError {
    fn from(e: handlebars::RenderError) -> Self {
        ApiError::Template(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (DomainError::not_found("Building", "x"), StatusCode::NOT_FOUND),
            (DomainError::already_exists("Owner", "phone", "1"), StatusCode::CONFLICT),
            (DomainError::Conflict("stale".into()), StatusCode::CONFLICT),
            (DomainError::rule("FLOOR_FULL", "full"), StatusCode::BAD_REQUEST),
            (
                DomainError::AlreadyDeleted { resource: "Unit", id: "1".into() },
                StatusCode::BAD_REQUEST,
            ),
            (DomainError::validation("bad"), StatusCode::UNPROCESSABLE_ENTITY),
            (DomainError::DatabaseError("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_insufficient_funds_metadata() {
        let err = ApiError::from(DomainError::InsufficientFunds {
            required: dec!(150.00),
            available: dec!(100.00),
        });
        assert_eq!(err.code(), "INSUFFICIENT_FUNDS");
        let metadata = err.metadata().unwrap();
        assert_eq!(metadata["required"], json!(dec!(150.00)));
        assert_eq!(metadata["available"], json!(dec!(100.00)));
    }

    #[test]
    fn test_internal_detail_is_hidden() {
        let err = ApiError::from(DomainError::DatabaseError("password=secret".into()));
        assert_eq!(err.detail(), "Internal server error");
        assert_eq!(err.code(), "DATABASE_ERROR");
    }
}
