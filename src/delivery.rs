//! Serves raw files out of the upload directory.
//!
//! Any file present in the directory is served whether or not a record points
//! at it. Content type, `Range` and conditional requests are handled by
//! `tower_http::services::ServeFile`.

use axum::{
    extract::Request,
    response::{IntoResponse, Response},
};
use tokio::fs;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::debug;

use crate::{
    error::{AppError, AppResult},
    storage::MediaLibrary,
};

pub async fn serve_file(library: &MediaLibrary, filename: &str, request: Request) -> AppResult<Response> {
    let path = library.resolve(filename)?;

    match fs::metadata(&path).await {
        Ok(metadata) if metadata.is_file() => {}
        Ok(_) => return Err(AppError::not_found("File not found")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::not_found("File not found"))
        }
        Err(e) => return Err(AppError::Io(e)),
    }

    debug!("Serving {:?}", path);
    let response = match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    Ok(response.into_response())
}
