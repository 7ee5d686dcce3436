//! s3-image-adapter server binary

use std::sync::Arc;

use anyhow::Context;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use s3_image_adapter::api::{create_router, AppState};
use s3_image_adapter::config::{AppConfig, LogFormat};
use s3_image_adapter::storage::create_store;
use s3_image_adapter::S3Adapter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;

    init_tracing(&config)?;

    let store_config = config
        .store_runtime()
        .context("invalid storage configuration")?;
    let store = create_store(store_config)
        .await
        .context("failed to initialise object store")?;

    let adapter = S3Adapter::new(config.adapter.clone(), store)
        .context("invalid adapter configuration")?;
    tracing::info!(
        bucket = %adapter.config().bucket,
        asset_host = %adapter.asset_host(),
        "Storage adapter initialised"
    );

    let mut state = AppState::new(Arc::new(adapter));
    if let Some(upload_dir) = &config.server.upload_dir {
        tokio::fs::create_dir_all(upload_dir)
            .await
            .with_context(|| format!("failed to create upload dir {}", upload_dir))?;
        state = state.with_upload_dir(upload_dir);
    }

    let router = create_router(state, &config.server).layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    tracing::info!(%addr, mount_path = %config.server.mount_path, "Listening for HTTP traffic");

    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.logging.level.clone()))
        .unwrap_or_else(|_| EnvFilter::new("s3_image_adapter=info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format {
        LogFormat::Json => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Text => {
            registry.with(tracing_subscriber::fmt::layer()).init();
        }
    }

    Ok(())
}
