use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use plexsync_core::DomainError;
use plexsync_infra::jobs::{JobStoreError, SubmitError};

pub fn submit_error_to_response(err: SubmitError) -> axum::response::Response {
    match err {
        SubmitError::InvalidUrl(e) => domain_error_to_response(e),
        e @ SubmitError::OutputDir { .. } => {
            tracing::error!(error = %e, "download request rejected");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "output_dir_error", e.to_string())
        }
        e @ SubmitError::Unavailable(_) => {
            tracing::warn!(error = %e, "download request rejected");
            json_error(StatusCode::SERVICE_UNAVAILABLE, "downloader_unavailable", e.to_string())
        }
        SubmitError::Store(e) => store_error_to_response(e),
    }
}

pub fn store_error_to_response(err: JobStoreError) -> axum::response::Response {
    match err {
        JobStoreError::NotFound(id) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("job {id} not found"))
        }
        e => json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string()),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
