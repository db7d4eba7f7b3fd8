//! API error taxonomy and its HTTP mapping
//!
//! Every failure leaves the service as `{ "error": string }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, SqlErr};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input, rejected before any write
    #[error("{0}")]
    Validation(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("{0}")]
    NotFound(String),
    /// The request violates the listing/sale state machine or a uniqueness rule
    #[error("{0}")]
    Conflict(String),
    /// The valuation model failed or answered with unusable content
    #[error("{0}")]
    Upstream(String),
    /// `rejected` is set when the chain answered but the transaction does not
    /// prove what the caller claims; otherwise the RPC itself failed
    #[error("{message}")]
    Chain { message: String, rejected: bool },
    #[error("Database error: {0}")]
    Database(DbErr),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Chain { rejected: true, .. } => StatusCode::BAD_REQUEST,
            ApiError::Chain { rejected: false, .. }
            | ApiError::Upstream(_)
            | ApiError::Database(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, status = status.as_u16(), "Request failed");
        } else {
            warn!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                ApiError::Conflict(format!("Duplicate record: {}", detail))
            }
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
                ApiError::NotFound("Referenced record not found".to_string())
            }
            _ => ApiError::Database(err),
        }
    }
}
