pub mod device;
pub mod middleware;

use db::error::AttendanceError;
use db::models::user_session::{Identity, Principal};
use sea_orm::DatabaseConnection;

use crate::error::ApiError;

/// Resolves the bearer token carried in a request body to an identity.
pub async fn authenticate(
    db: &DatabaseConnection,
    token: &str,
) -> Result<Identity, ApiError> {
    let identity = db::models::user_session::Model::resolve(db, token).await?;
    Ok(identity)
}

/// Pattern-matched role gates. Handlers destructure the principal instead of
/// comparing role strings, so an unauthorized role is an unmatched arm, not
/// a typo.
pub fn require_student(identity: &Identity) -> Result<i64, ApiError> {
    match identity.principal {
        Principal::Student { student_id } => Ok(student_id),
        Principal::Lecturer { .. } => Err(ApiError(AttendanceError::forbidden(
            "This action requires a student account",
        ))),
    }
}

pub fn require_lecturer(identity: &Identity) -> Result<i64, ApiError> {
    match identity.principal {
        Principal::Lecturer { lecturer_id } => Ok(lecturer_id),
        Principal::Student { .. } => Err(ApiError(AttendanceError::forbidden(
            "This action requires a lecturer account",
        ))),
    }
}
