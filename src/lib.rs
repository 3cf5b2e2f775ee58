//! Self-hosted video upload and playback service.
//!
//! Uploaded files live in a flat directory, one metadata row per file lives in
//! SQLite, and a handful of HTML pages list and play them back.

use axum::{routing::get, Router};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

pub mod catalog;
pub mod cleanup;
pub mod config;
pub mod db;
pub mod delivery;
pub mod error;
pub mod handlers;
pub mod models;
pub mod storage;
pub mod templates;
pub mod upload;

use catalog::Catalog;
use config::Config;
use db::VideoStore;
use handlers::{
    home_handler, upload_form_handler, upload_handler, uploaded_file_handler, watch_handler,
};
use models::AppState;
use storage::MediaLibrary;
use upload::UploadPipeline;

/// Open storage, make sure the schema and upload directory exist, and wire the components.
pub async fn build_state(config: Config) -> anyhow::Result<Arc<AppState>> {
    let library = MediaLibrary::new(&config.upload_dir, config.upload_buffer_size);
    library.ensure_dir().await?;
    check_database_outside_uploads(&config).await?;

    let store = VideoStore::connect(&config.database_path, config.max_connections).await?;
    store.initialize().await?;

    Ok(Arc::new(AppState {
        catalog: Catalog::new(store.clone()),
        uploads: UploadPipeline::new(store, library.clone(), &config),
        library,
        templates: Arc::new(templates::build()?),
        config: Arc::new(config),
    }))
}

/// The upload directory is swept for unreferenced files and served as-is, so the
/// database and its WAL side files must live somewhere else.
async fn check_database_outside_uploads(config: &Config) -> anyhow::Result<()> {
    let upload_dir = tokio::fs::canonicalize(&config.upload_dir).await?;

    let db_dir = config
        .database_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(db_dir).await?;
    let db_dir = tokio::fs::canonicalize(db_dir).await?;

    if db_dir.starts_with(&upload_dir) {
        anyhow::bail!(
            "database path {:?} is inside the upload directory {:?}",
            config.database_path,
            config.upload_dir
        );
    }
    Ok(())
}

/// Start the orphan sweep when the configuration enables it.
pub fn spawn_maintenance(state: &AppState) -> Option<tokio::task::JoinHandle<()>> {
    let interval = state.config.orphan_sweep_interval_seconds;
    if interval == 0 {
        return None;
    }
    Some(cleanup::start_sweep_task(
        state.catalog.store().clone(),
        state.library.clone(),
        Duration::from_secs(interval),
        Duration::from_secs(state.config.orphan_grace_seconds),
    ))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home_handler))
        .route("/upload", get(upload_form_handler).post(upload_handler))
        .route("/watch/:id", get(watch_handler))
        .route("/uploads/:filename", get(uploaded_file_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
