//! File-serving endpoints for stored acquisitions and stems

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use mediastem_common::Error;
use std::path::Path as FsPath;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::AppState;

/// GET /api/result/{id}
///
/// Streams the stored bytes with the stored download filename.
pub async fn download_result(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let record = state
        .store
        .get(&id)
        .ok_or_else(|| Error::NotFound(format!("unknown acquisition: {id}")))?;

    let path = state.config.download_file(&id, record.kind);
    serve_file(&path, record.kind.media_type(), &record.filename).await
}

/// GET /api/stem/{id}/{name}
pub async fn download_stem(
    State(state): State<AppState>,
    Path((id, name)): Path<(Uuid, String)>,
) -> ApiResult<Response> {
    if name.contains("..") || name.contains('\\') || name.contains('"') {
        return Err(Error::InvalidInput(format!("invalid stem name: {name}")).into());
    }

    let record = state
        .store
        .get(&id)
        .ok_or_else(|| Error::NotFound(format!("unknown acquisition: {id}")))?;

    let path = state
        .separator
        .stem_path(&id, &name)
        .ok_or_else(|| Error::NotFound(format!("stem '{name}' not found for {id}")))?;

    let filename = format!("{} - {}.mp3", record.title, name);
    serve_file(&path, "audio/mpeg", &filename).await
}

async fn serve_file(path: &FsPath, media_type: &str, filename: &str) -> ApiResult<Response> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|_| Error::NotFound("stored file is missing".to_string()))?;

    let stream = ReaderStream::new(file);
    let headers = [
        (header::CONTENT_TYPE, media_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ];
    Ok((headers, Body::from_stream(stream)).into_response())
}
