use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use plexsync_core::JobId;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/download", post(submit_download))
        .route("/jobs", get(list_jobs))
        .route("/jobs/:id", get(get_job))
}

pub async fn submit_download(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::DownloadRequest>,
) -> axum::response::Response {
    match services.jobs.submit(&body.source_url).await {
        Ok(job) => (
            StatusCode::ACCEPTED,
            Json(dto::DownloadAccepted::new(&job, services.jobs.output_dir())),
        )
            .into_response(),
        Err(e) => errors::submit_error_to_response(e),
    }
}

pub async fn get_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match id.parse::<JobId>() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.jobs.get(id) {
        Ok(job) => (StatusCode::OK, Json(job)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_jobs(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ListJobsQuery>,
) -> axum::response::Response {
    let status = match query.status() {
        Ok(status) => status,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.jobs.list(status, query.limit()) {
        Ok(jobs) => (StatusCode::OK, Json(dto::JobList { jobs })).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
