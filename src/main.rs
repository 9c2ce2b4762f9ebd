#![deny(unused)]
//! Planview - floor plan review service
//!
//! Accepts floor plan uploads, returns review feedback from a hosted vision
//! model, and renders a pseudo-3D view of the plan on request.

use std::sync::Arc;
use std::time::Duration;

use planview_core::config::AppConfig;
use planview_core::traits::{Prunable, TransientStore, VisionModel};
use planview_gateway::{GatewayConfig, GatewayServer};
use planview_model_gateway::GeminiClient;
use planview_store::{spawn_sweeper, FsTransientStore, RetentionPolicy};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up GEMINI_API_KEY and friends from a local .env
    dotenv::dotenv().ok();

    let mut config = AppConfig::load()?;
    config.validate()?;

    planview_governance::configure_tracing(config.logging.json)?;
    tracing::info!("Starting Planview v{}", env!("CARGO_PKG_VERSION"));

    let metrics_handle = planview_governance::setup_metrics_recorder()?;

    // =========================================================================
    // Transient Store
    // =========================================================================
    let fs_store = Arc::new(FsTransientStore::open(&config.upload.upload_folder).await?);
    tracing::info!(root = %fs_store.root().display(), "Upload folder ready");

    let retention = RetentionPolicy::new(
        Duration::from_secs(config.upload.temp_ttl_secs),
        Duration::from_secs(config.upload.sweep_interval_secs),
    );
    let prunable: Arc<dyn Prunable> = fs_store.clone();
    let _sweeper = spawn_sweeper(prunable, retention);
    let store: Arc<dyn TransientStore> = fs_store;

    // =========================================================================
    // Vision Model
    // =========================================================================
    let model: Arc<dyn VisionModel> = Arc::new(GeminiClient::new(&config.model)?);
    tracing::info!(
        model = %config.model.model,
        image_model = %config.model.image_model,
        "Vision model client initialized"
    );

    // =========================================================================
    // Gateway
    // =========================================================================
    let server = GatewayServer::new(GatewayConfig::from_app(&config), store, model, &config.model)
        .with_metrics(metrics_handle);

    server.run().await?;

    Ok(())
}
