use std::sync::Arc;

use crop_disease_detector::{router, AppState, Config, GeminiClient};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let model = GeminiClient::new(&config)?;
    let state = Arc::new(AppState::new(Arc::new(model)));
    let app = router(state, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, model = %config.model, "server running");
    info!("open http://localhost:{} in your browser", config.bind_addr.port());

    axum::serve(listener, app).await?;
    Ok(())
}
