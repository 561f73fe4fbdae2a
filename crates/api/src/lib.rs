//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST routes for leave applications and balances
//! - JWT authentication middleware
//! - Error rendering for domain errors
//! - An email-backed leave notifier

pub mod error;
pub mod middleware;
pub mod notifier;
pub mod routes;

use axum::Router;
use leavemark_core::engine::LeaveEngine;
use leavemark_shared::JwtService;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use notifier::EmailNotifier;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Leave lifecycle engine.
    pub engine: LeaveEngine,
    /// JWT service for token operations.
    pub jwt_service: Arc<JwtService>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support;
