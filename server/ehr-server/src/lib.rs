//! EHR Engine HTTP server
//!
//! Patients and doctors register, sign in and reach their records through a
//! JSON API. Tokens are issued by `auth-identity`; every protected route runs
//! the access gate in [`middleware::auth_context`] before its role guard.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;

pub use config::{Environment, ServerConfig};
pub use error::*;
pub use server::{EhrServer, StorageKind};

use axum::{middleware::from_fn, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Create the application router with all routes and middleware
pub fn create_app(server: EhrServer) -> Router {
    let cors = middleware::create_cors_layer(&server.config.cors_origins);

    routes::create_routes(&server)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(from_fn(middleware::request_timing_middleware)),
        )
        .with_state(server)
}
