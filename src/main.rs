use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use symptom_api::{api, config::Settings, InferenceTransformer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    symptom_api::init_tracing();

    let settings = Settings::from_env();

    // artifacts are loaded once and shared read-only by every request
    let transformer = InferenceTransformer::load(&settings.artifacts, settings.onnx_runtime)
        .with_context(|| format!("failed to load artifacts from {}", settings.model_dir.display()))?;

    let app = api::router(Arc::new(transformer));

    let addr = settings.addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown");
}
