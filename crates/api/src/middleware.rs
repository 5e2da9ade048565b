use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use plexsync_auth::{CredentialValidator, ACCESS_KEY_HEADER};

use crate::app::errors::json_error;

#[derive(Clone)]
pub struct AuthState {
    pub validator: Arc<dyn CredentialValidator>,
}

/// Reject requests without a valid access key before any handler runs.
pub async fn access_key_middleware(
    State(state): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if let Err(e) = state.validator.validate(extract_key(req.headers())) {
        tracing::debug!(path = %req.uri().path(), error = %e, "access denied");
        return json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    next.run(req).await
}

fn extract_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(ACCESS_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
}
