use serde::Serialize;
use std::sync::Arc;
use tera::Tera;

use crate::{catalog::Catalog, config::Config, storage::MediaLibrary, upload::UploadPipeline};

/// One uploaded video. Rows are never updated once inserted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Video {
    pub id: i64,
    pub title: String,
    /// Name of the file inside the upload directory.
    pub filename: String,
    /// `YYYY-MM-DD HH:MM:SS.SSS` in UTC, assigned by the database.
    pub upload_time: String,
}

impl Video {
    /// MIME type for the `<source>` element, guessed from the stored filename.
    pub fn content_type(&self) -> String {
        mime_guess::from_path(&self.filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }
}

/// Shape handed to page templates.
#[derive(Serialize)]
pub struct VideoView {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub content_type: String,
    pub upload_time: String,
}

impl From<&Video> for VideoView {
    fn from(video: &Video) -> Self {
        Self {
            id: video.id,
            title: video.title.clone(),
            url: format!("/uploads/{}", video.filename),
            content_type: video.content_type(),
            upload_time: video.upload_time.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
    pub uploads: UploadPipeline,
    pub library: MediaLibrary,
    pub templates: Arc<Tera>,
    pub config: Arc<Config>,
}
