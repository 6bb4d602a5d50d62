//! # Database Error Types
//!
//! ```text
//! sqlx::Error ──► DbError ──► OrderError::Db (tx dropped) ──► ApiError
//!                    │
//!                    ├── Busy / PoolExhausted     retryable, 409 / 503
//!                    ├── UniqueViolation          e.g. second coupon usage
//!                    ├── CheckViolation           stock, balance or quota
//!                    │                            would leave its range
//!                    └── everything else          500
//! ```
//!
//! SQLite reports constraint failures through extended result codes; those
//! are mapped by `sqlx`'s [`ErrorKind`](sqlx::error::ErrorKind). Lock
//! contention has no kind, so it is recognised by its primary code.

use sqlx::error::ErrorKind;
use thiserror::Error;

/// `SQLITE_BUSY` and `SQLITE_LOCKED`, including their extended codes.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

#[derive(Debug, Error)]
pub enum DbError {
    /// `fetch_one` found nothing.
    #[error("Record not found")]
    NotFound,

    /// A UNIQUE index rejected the row. Carries SQLite's message, which
    /// names the table and column.
    #[error("Duplicate row: {0}")]
    UniqueViolation(String),

    /// A CHECK constraint rejected the row.
    #[error("Constraint violated: {0}")]
    CheckViolation(String),

    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// The write lock was not granted within the busy timeout.
    #[error("Database is busy, please retry")]
    Busy,

    /// No pooled connection became free in time.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    ErrorKind::UniqueViolation => DbError::UniqueViolation(message),
                    ErrorKind::CheckViolation => DbError::CheckViolation(message),
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation(message),
                    _ if is_lock_contention(db_err.code().as_deref()) => DbError::Busy,
                    _ => DbError::QueryFailed(message),
                }
            }
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Extended result codes keep the primary code in the low byte.
fn is_lock_contention(code: Option<&str>) -> bool {
    code.and_then(|c| c.parse::<i32>().ok())
        .map(|c| matches!(c & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
        .unwrap_or(false)
}

pub type DbResult<T> = Result<T, DbError>;
