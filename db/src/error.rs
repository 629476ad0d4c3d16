//! Error taxonomy shared by every domain operation.
//!
//! Messages on the non-`Db` variants are safe to show to end users; the api
//! crate maps each variant onto an HTTP status in one place.

use sea_orm::{DbErr, SqlErr, TransactionError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AttendanceError {
    /// Bad input (geometry out of range, malformed field, short password).
    #[error("{0}")]
    Validation(String),

    /// Missing, unknown, or expired credentials.
    #[error("{0}")]
    Auth(String),

    /// Authenticated, but the wrong role for the action.
    #[error("{0}")]
    Forbidden(String),

    /// Unknown session, course, student, or user.
    #[error("{0}")]
    NotFound(String),

    /// Duplicate attendance, duplicate registration key, inactive session.
    #[error("{0}")]
    Conflict(String),

    /// Requester is outside the geofence; `overage_m` is meters past the edge.
    #[error("You are {overage_m:.2}m outside the attendance zone")]
    OutOfZone { distance_m: f64, overage_m: f64 },

    /// Persistence failure. The inner error is logged, never shown.
    #[error("Database error")]
    Db(#[from] DbErr),
}

impl AttendanceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AttendanceError::Validation(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        AttendanceError::Auth(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AttendanceError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AttendanceError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AttendanceError::Conflict(msg.into())
    }

    /// Maps a unique-constraint violation to a `Conflict` with the given
    /// message, passing every other database error through unchanged.
    ///
    /// This is the insert-or-reject pattern: callers insert unconditionally
    /// and let the storage layer detect the duplicate.
    pub fn conflict_on_unique(err: DbErr, msg: &str) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => AttendanceError::Conflict(msg.into()),
            _ => AttendanceError::Db(err),
        }
    }
}

impl From<TransactionError<AttendanceError>> for AttendanceError {
    fn from(err: TransactionError<AttendanceError>) -> Self {
        match err {
            TransactionError::Connection(db) => AttendanceError::Db(db),
            TransactionError::Transaction(inner) => inner,
        }
    }
}
