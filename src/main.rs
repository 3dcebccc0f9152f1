use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use txt2img_gallery::{
    config::AppConfig,
    inference::InferenceClient,
    router::build_router,
    state::AppState,
    storage::LocalFileStorage,
    store::ImageRecordStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "txt2img_gallery=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        upload_dir = %config.upload_dir.display(),
        "Loaded configuration"
    );

    let storage = LocalFileStorage::new(config.upload_dir.clone());
    storage
        .ensure_dir()
        .await
        .with_context(|| format!("failed to create {}", config.upload_dir.display()))?;

    let store = ImageRecordStore::connect(&config.database_url)
        .await
        .context("failed to open database")?;
    store.health_check().await.context("database health check failed")?;
    tracing::info!("Database ready, migrations applied");

    let inference = InferenceClient::new(config.inference.clone())
        .context("failed to build inference client")?;
    if !inference.has_credential() {
        tracing::warn!("HUGGINGFACE_API_KEY is not set; image generation requests will fail");
    }

    let bind_address = config.bind_address();
    let state = AppState {
        store,
        storage: Arc::new(storage),
        inference: Arc::new(inference),
        config: Arc::new(config),
    };
    let router = build_router(state);

    let tcp_listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;
    tracing::info!("Text-to-image server listening on http://{bind_address}");

    axum::serve(tcp_listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}
