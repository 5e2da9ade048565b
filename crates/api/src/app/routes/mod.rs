use axum::Router;

pub mod jobs;
pub mod system;

/// Router for all endpoints behind the access key.
pub fn router() -> Router {
    Router::new().nest("/api", jobs::router())
}
