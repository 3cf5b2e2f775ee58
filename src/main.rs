use tracing::info;
use tracing_subscriber::EnvFilter;

use video_streamer::{build_state, config::Config, router, spawn_maintenance};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("video_streamer=debug,tower_http=debug")),
        )
        .init();

    // Load configuration
    let config = Config::from_env();
    let addr = config.bind_address();

    info!("📁 Upload Dir: {:?}", config.upload_dir);
    info!("🗄️  Database: {:?}", config.database_path);
    info!("🎞️  Allowed extensions: {}", config.allowed_extensions.join(", "));

    let state = build_state(config).await?;
    let _sweeper = spawn_maintenance(&state);

    let app = router(state.clone());

    info!("🚀 Server starting on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("✅ Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.catalog.store().close().await;
    info!("👋 Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
