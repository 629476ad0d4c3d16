//! HTTP route entry point for `/api/...`.
//!
//! Route groups:
//! - `/health` → liveness check (public)
//! - `/auth` → action-dispatched authentication endpoint
//! - `/attendance` → action-dispatched attendance endpoint
//!
//! Both action endpoints authenticate per-action: the bearer token travels
//! in the request body next to the action name, so there is no route-level
//! auth middleware.

pub mod attendance;
pub mod auth;
pub mod health;

use axum::{
    Router,
    routing::{get, post},
};
use util::state::AppState;

/// Builds the application router for all HTTP endpoints.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/auth", post(auth::dispatch))
        .route("/attendance", post(attendance::dispatch))
}
