use axum::{
    extract::{Path, Request, State},
    http::header::CONTENT_TYPE,
    response::{Html, Redirect, Response},
};
use bytes::Bytes;
use futures::stream;
use multer::{Constraints, Multipart, SizeLimit};
use std::{convert::Infallible, sync::Arc};
use tera::Context;
use tracing::{error, info, warn};

use crate::{
    delivery,
    error::{AppError, AppResult},
    models::{AppState, VideoView},
    templates,
};

const MAX_TITLE_BYTES: u64 = 64 * 1024;

/// Catalog page
pub async fn home_handler(State(state): State<Arc<AppState>>) -> AppResult<Html<String>> {
    let videos = state.catalog.list_catalog().await?;
    let views: Vec<VideoView> = videos.iter().map(VideoView::from).collect();

    let mut context = Context::new();
    context.insert("videos", &views);
    Ok(Html(templates::render(&state.templates, "home.html", &context)?))
}

/// Upload form
pub async fn upload_form_handler(State(state): State<Arc<AppState>>) -> AppResult<Html<String>> {
    let accept = state
        .config
        .allowed_extensions
        .iter()
        .map(|ext| format!(".{}", ext))
        .collect::<Vec<_>>()
        .join(",");

    let mut context = Context::new();
    context.insert("accept", &accept);
    Ok(Html(templates::render(&state.templates, "upload.html", &context)?))
}

/// Upload video file
///
/// The `file` part is streamed straight to disk when `title` came before it,
/// which is the order browsers submit the upload form in. Otherwise its
/// extension is checked and it is held in memory until the title has been read.
/// Once the video is stored the remaining parts are not read.
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> AppResult<Redirect> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(AppError::missing_fields)?;

    let boundary = multer::parse_boundary(content_type).map_err(|e| {
        error!("Failed to parse boundary: {}", e);
        AppError::missing_fields()
    })?;

    let mut multipart = Multipart::with_constraints(
        request.into_body().into_data_stream(),
        boundary,
        Constraints::new().size_limit(SizeLimit::new().for_field("title", MAX_TITLE_BYTES)),
    );

    let mut title: Option<String> = None;
    let mut stored_id: Option<i64> = None;
    let mut held_file: Option<(Option<String>, Vec<Bytes>)> = None;
    let mut saw_file = false;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("title") if title.is_none() => {
                title = Some(field.text().await.map_err(multipart_error)?);
            }
            Some("file") if !saw_file => {
                saw_file = true;
                let file_name = field.file_name().map(str::to_string);
                if title.is_some() {
                    let id = state
                        .uploads
                        .handle_upload(title.as_deref(), Some(field), file_name.as_deref())
                        .await?;
                    stored_id = Some(id);
                    // The video is committed; the rest of the form cannot change the outcome.
                    break;
                }

                let Some(original) = file_name.as_deref().filter(|n| !n.is_empty()) else {
                    return Err(AppError::missing_fields());
                };
                if state.uploads.allowed_extension(original).is_none() {
                    warn!("[POST /upload] ❌ Rejected: {:?} has a disallowed extension", original);
                    return Err(AppError::invalid_file_type());
                }
                let chunks = hold_field(&mut field, state.config.max_file_size).await?;
                held_file = Some((file_name, chunks));
            }
            _ => {
                // Drain the field
                while field.chunk().await.map_err(multipart_error)?.is_some() {}
            }
        }
    }

    let id = match (stored_id, held_file) {
        (Some(id), _) => id,
        (None, Some((file_name, chunks))) => {
            let body = stream::iter(chunks.into_iter().map(Ok::<_, Infallible>));
            state
                .uploads
                .handle_upload(title.as_deref(), Some(body), file_name.as_deref())
                .await?
        }
        (None, None) => return Err(AppError::missing_fields()),
    };

    info!("[POST /upload] ↪️  Redirecting to catalog after video {}", id);
    Ok(Redirect::to("/"))
}

/// Watch page
pub async fn watch_handler(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> AppResult<Html<String>> {
    let id = raw_id
        .parse::<i64>()
        .ok()
        .filter(|&id| id > 0)
        .ok_or_else(|| AppError::not_found("Video not found"))?;

    let video = state.catalog.get_video(id).await?;

    let mut context = Context::new();
    context.insert("video", &VideoView::from(&video));
    Ok(Html(templates::render(&state.templates, "watch.html", &context)?))
}

/// Raw uploaded file
pub async fn uploaded_file_handler(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    request: Request,
) -> AppResult<Response> {
    delivery::serve_file(&state.library, &filename, request).await
}

async fn hold_field(field: &mut multer::Field<'_>, max_bytes: u64) -> AppResult<Vec<Bytes>> {
    let mut chunks = Vec::new();
    let mut size = 0u64;
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        size += chunk.len() as u64;
        if size > max_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "File too large. Maximum file size is {}MB.",
                max_bytes / 1024 / 1024
            )));
        }
        chunks.push(chunk);
    }
    Ok(chunks)
}

fn multipart_error(e: multer::Error) -> AppError {
    error!("Multipart parsing error: {}", e);
    AppError::Validation(format!("Error parsing multipart request: {}", e))
}
