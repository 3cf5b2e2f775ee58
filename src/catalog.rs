use crate::{
    db::VideoStore,
    error::{AppError, AppResult},
    models::Video,
};

/// Read side of the video table.
#[derive(Clone)]
pub struct Catalog {
    store: VideoStore,
}

impl Catalog {
    pub fn new(store: VideoStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &VideoStore {
        &self.store
    }

    /// All videos, most recently uploaded first.
    pub async fn list_catalog(&self) -> AppResult<Vec<Video>> {
        self.store.list_all().await
    }

    pub async fn get_video(&self, id: i64) -> AppResult<Video> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Video not found"))
    }
}
