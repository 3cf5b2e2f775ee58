use bytes::Bytes;
use futures::Stream;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::{
    config::Config,
    db::VideoStore,
    error::{AppError, AppResult},
    storage::{file_extension, MediaLibrary},
};

/// Validates an upload, writes the file, then records it.
#[derive(Clone)]
pub struct UploadPipeline {
    store: VideoStore,
    library: MediaLibrary,
    allowed_extensions: Arc<Vec<String>>,
    max_file_size: u64,
}

impl UploadPipeline {
    pub fn new(store: VideoStore, library: MediaLibrary, config: &Config) -> Self {
        Self {
            store,
            library,
            allowed_extensions: Arc::new(config.allowed_extensions.clone()),
            max_file_size: config.max_file_size,
        }
    }

    /// Lowercase extension of `filename` if it is on the allow-list.
    pub fn allowed_extension(&self, filename: &str) -> Option<String> {
        file_extension(filename).filter(|ext| self.allowed_extensions.iter().any(|a| a == ext))
    }

    /// Store one uploaded video and return its new id.
    ///
    /// The file is fully written and synced before the row is inserted. If the
    /// insert fails the file is deleted again, so a failed upload leaves nothing
    /// behind.
    pub async fn handle_upload<S, E>(
        &self,
        title: Option<&str>,
        file: Option<S>,
        original_filename: Option<&str>,
    ) -> AppResult<i64>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Display,
    {
        let start_time = Instant::now();

        let (title, file, original_filename) = match (title, file, original_filename) {
            (Some(title), Some(file), Some(name)) if !title.is_empty() && !name.is_empty() => {
                (title, file, name)
            }
            _ => {
                warn!("[POST /upload] ❌ Rejected: missing title or file");
                return Err(AppError::missing_fields());
            }
        };

        let extension = self.allowed_extension(original_filename).ok_or_else(|| {
            warn!(
                "[POST /upload] ❌ Rejected: {:?} has a disallowed extension",
                original_filename
            );
            AppError::invalid_file_type()
        })?;

        let stored_name = MediaLibrary::generate_name(original_filename, &extension);
        info!("[POST /upload] 📁 File: {} -> {}", original_filename, stored_name);

        let size = self
            .library
            .write_stream(&stored_name, file, self.max_file_size)
            .await
            .map_err(|e| {
                error!("[POST /upload] ❌ Failed to save {}: {}", stored_name, e);
                e
            })?;

        let id = match self.store.insert(title, &stored_name).await {
            Ok(id) => id,
            Err(e) => {
                error!(
                    "[POST /upload] ❌ Failed to record {}, removing file: {}",
                    stored_name, e
                );
                self.library.remove(&stored_name).await;
                return Err(e);
            }
        };

        info!(
            "[POST /upload] 📦 Size: {:.2} MB ({} bytes)",
            size as f64 / 1024.0 / 1024.0,
            size
        );
        info!(
            "[POST /upload] ✅ SUCCESS - Video ID: {} in {:.2}s",
            id,
            start_time.elapsed().as_secs_f64()
        );

        Ok(id)
    }
}
