//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST routes for accounts, transactions, transfers and summaries
//! - Sign-up and login
//! - Bearer-token middleware
//! - Error-to-response mapping

pub mod error;
pub mod middleware;
pub mod routes;

use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use fintrack_db::{LedgerRepository, UserRepository};
use fintrack_shared::JwtService;

/// Application state shared across handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Per-owner ledgers.
    pub ledger: LedgerRepository,
    /// Registered users.
    pub users: UserRepository,
    /// JWT service for token operations.
    pub jwt_service: Arc<JwtService>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
