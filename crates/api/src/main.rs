use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use plexsync_api::app::{build_app, build_services, ServiceSettings};
use plexsync_api::config::Config;
use plexsync_auth::{AccessKey, SharedSecretValidator};
use plexsync_infra::source::SpotdlConnector;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    plexsync_observability::init(config.log_format);

    let key = AccessKey::new(config.api_key.clone()).context("API_KEY")?;
    let validator = Arc::new(SharedSecretValidator::new(key));

    let connector = Arc::new(SpotdlConnector::new(config.spotdl()));
    let services = Arc::new(build_services(connector, ServiceSettings::from_config(&config)));
    let app = build_app(services, validator);

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        music_dir = %config.music_dir.display(),
        "listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
