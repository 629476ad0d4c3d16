use axum::Json;

use crate::response::{ApiResponse, Empty};

/// GET /api/health
///
/// Liveness check. Answers as soon as the process can serve requests.
pub async fn health() -> Json<ApiResponse<Empty>> {
    Json(ApiResponse::ok("API is healthy"))
}
