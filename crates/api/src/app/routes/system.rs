use std::sync::Arc;

use axum::{extract::Extension, Json};

use crate::app::dto::HealthResponse;
use crate::app::services::AppServices;

pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> Json<HealthResponse> {
    let dir = services.jobs.output_dir();
    let output_dir_exists = tokio::fs::metadata(dir)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);

    Json(HealthResponse {
        status: "ok",
        output_dir: dir.display().to_string(),
        output_dir_exists,
        downloader_ready: services.jobs.downloader_ready().await,
        jobs: services.jobs.stats(),
    })
}
