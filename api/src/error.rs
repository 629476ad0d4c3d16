//! Maps domain errors onto HTTP responses in one place.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use db::error::AttendanceError;
use tracing::error;

use crate::response::ApiResponse;

/// Error half of every handler's return type. Wraps the domain taxonomy and
/// renders it as the standard envelope with the right status code.
pub struct ApiError(pub AttendanceError);

impl From<AttendanceError> for ApiError {
    fn from(err: AttendanceError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        // serde's message names the missing or malformed field.
        ApiError(AttendanceError::validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AttendanceError::Validation(_) => StatusCode::BAD_REQUEST,
            AttendanceError::Auth(_) => StatusCode::UNAUTHORIZED,
            AttendanceError::Forbidden(_) => StatusCode::FORBIDDEN,
            AttendanceError::NotFound(_) => StatusCode::NOT_FOUND,
            // Duplicates and inactive sessions answer 400, not 409: the
            // client did nothing retryable, the request itself is wrong.
            AttendanceError::Conflict(_) => StatusCode::BAD_REQUEST,
            AttendanceError::OutOfZone { .. } => StatusCode::BAD_REQUEST,
            AttendanceError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if let AttendanceError::Db(inner) = &self.0 {
            error!("database error: {inner}");
        }

        // Display on the taxonomy is already user-safe; Db prints a generic
        // message.
        (status, Json(ApiResponse::error(self.0.to_string()))).into_response()
    }
}
