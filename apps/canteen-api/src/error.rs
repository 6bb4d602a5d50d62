//! # API Error Types
//!
//! Everything a handler can fail with, and how it looks on the wire.
//!
//! ## Status Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CoreError::kind()                                                      │
//! │    Validation ─────────────────────────────► 400                        │
//! │    NotFound ───────────────────────────────► 404                        │
//! │    Forbidden ──────────────────────────────► 403                        │
//! │    BusinessRule ──┬── stock validation ────► 409                        │
//! │                   ├── wallet balance ──────► 422                        │
//! │                   └── everything else ─────► 400                        │
//! │    Conflict (lost guarded update) ─────────► 409                        │
//! │    Payment ────────────────────────────────► 402                        │
//! │                                                                         │
//! │  DbError   Busy ► 409   PoolExhausted ► 503   other ► 500 (+ traceId)   │
//! │  Token missing / invalid ► 401   wrong role ► 403                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every response carries `{ "code", "message" }` and an `X-Error-Code`
//! header with the same code.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use canteen_core::{CoreError, ErrorKind, StockIssue, ValidationError};
use canteen_db::{DbError, OrderError};

/// Errors returned by handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),

    /// Missing, malformed or expired credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but the role does not allow the route.
    #[error("{0}")]
    Forbidden(String),

    /// Request body or path could not be parsed.
    #[error("{message}")]
    BadRequest { code: &'static str, message: String },

    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// JSON error body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Uuid>,
    /// Per-line detail for stock validation failures.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<IssueBody>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueBody {
    pub product_id: i64,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested: Option<i64>,
}

impl From<&StockIssue> for IssueBody {
    fn from(issue: &StockIssue) -> Self {
        match *issue {
            StockIssue::NotInInventory { product_id } => IssueBody {
                product_id,
                code: issue.code(),
                available: None,
                requested: None,
            },
            StockIssue::Insufficient {
                product_id,
                available,
                requested,
            } => IssueBody {
                product_id,
                code: issue.code(),
                available: Some(available),
                requested: Some(requested),
            },
        }
    }
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Core(err) => core_status(err),
            ApiError::Db(DbError::Busy) => StatusCode::CONFLICT,
            ApiError::Db(DbError::PoolExhausted) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Db(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        }
    }

    /// Machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Core(err) => err.code(),
            ApiError::Db(DbError::Busy) => "DATABASE_BUSY",
            ApiError::Db(DbError::PoolExhausted) => "SERVICE_UNAVAILABLE",
            ApiError::Db(_) | ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::BadRequest { code, .. } => *code,
        }
    }

    /// Payment failures surface as 400 on the standalone verify endpoint.
    pub fn payment_as_bad_request(self) -> Self {
        match self {
            ApiError::Core(err) if err.kind() == ErrorKind::Payment => ApiError::BadRequest {
                code: err.code(),
                message: err.to_string(),
            },
            other => other,
        }
    }
}

fn core_status(err: &CoreError) -> StatusCode {
    match err.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Payment => StatusCode::PAYMENT_REQUIRED,
        ErrorKind::BusinessRule => match err {
            CoreError::StockValidationFailed(_) => StatusCode::CONFLICT,
            CoreError::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::BAD_REQUEST,
        },
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Core(e) => ApiError::Core(e),
            OrderError::Db(e) => ApiError::Db(e),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Core(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest {
            code: "VALIDATION_ERROR",
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest {
            code: "VALIDATION_ERROR",
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let body = if status.is_server_error() {
            let trace_id = Uuid::new_v4();
            if status == StatusCode::INTERNAL_SERVER_ERROR {
                error!(%trace_id, error = %self, "Request failed");
            } else {
                warn!(%trace_id, error = %self, "Request failed");
            }
            ErrorBody {
                code: code.to_string(),
                message: "Internal server error".to_string(),
                trace_id: Some(trace_id),
                issues: Vec::new(),
            }
        } else {
            let issues = match &self {
                ApiError::Core(CoreError::StockValidationFailed(issues)) => issues.iter().map(IssueBody::from).collect(),
                _ => Vec::new(),
            };
            ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
                trace_id: None,
                issues,
            }
        };

        let mut response = (status, Json(body)).into_response();
        response
            .headers_mut()
            .insert("X-Error-Code", HeaderValue::from_static(code));
        response
    }
}
