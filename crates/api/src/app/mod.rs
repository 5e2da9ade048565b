//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: job system wiring (store, executor, dispatcher, sweeper)
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};

use plexsync_auth::CredentialValidator;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{build_services, AppServices, ServiceSettings};

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: Arc<AppServices>, validator: Arc<dyn CredentialValidator>) -> Router {
    let auth_state = middleware::AuthState { validator };

    // Protected routes: require the access key.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::access_key_middleware,
    ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(Extension(services))
}
