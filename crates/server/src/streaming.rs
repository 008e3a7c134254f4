use std::io::SeekFrom;

use axum::body::Body;
use axum::extract::{Path as AxumPath, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use common::{audio_mime, Track};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::warn;

use crate::range::{resolve_range, RangeSpec};
use crate::state::AppState;
use crate::utils::json_error_response;

const STREAM_CACHE_CONTROL: &str = "public, max-age=86400";
const COVER_CACHE_CONTROL: &str = "public, max-age=604800";
const PLACEHOLDER_CACHE_CONTROL: &str = "public, max-age=3600";

const PLACEHOLDER_COVER_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 200 200" width="200" height="200">
  <rect width="200" height="200" fill="#1a1a2e"/>
  <circle cx="100" cy="90" r="40" fill="none" stroke="#4a4a6a" stroke-width="3"/>
  <circle cx="100" cy="90" r="15" fill="#4a4a6a"/>
  <path d="M130 90 L130 50 L150 55 L150 70" fill="none" stroke="#4a4a6a" stroke-width="3" stroke-linecap="round"/>
  <text x="100" y="160" text-anchor="middle" fill="#6a6a8a" font-family="sans-serif" font-size="12">No Cover</text>
</svg>"##;

/// `GET /tracks/:id/stream`: audio bytes with range support.
///
/// Every request bumps the play count, ranged or not; a playback session
/// that seeks will therefore over-count. The increment is fire-and-forget
/// and can never fail the stream.
pub async fn stream_track(
    State(state): State<AppState>,
    AxumPath(track_id): AxumPath<String>,
    headers: HeaderMap,
) -> Response {
    let track = match lookup_track(&state, &track_id) {
        Ok(track) => track,
        Err(response) => return response,
    };

    let file_size = match tokio::fs::metadata(&track.file_path).await {
        Ok(meta) => meta.len(),
        // The record exists but the scanned path went stale; the message
        // distinguishes this from a missing track record.
        Err(_) => {
            return json_error_response(StatusCode::NOT_FOUND, "audio file not found on disk")
        }
    };
    let mime = audio_mime(&track.format);

    spawn_play_count_increment(&state, &track.id);

    let range_header = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok());

    match resolve_range(range_header, file_size) {
        RangeSpec::Full => {
            let file = match tokio::fs::File::open(&track.file_path).await {
                Ok(file) => file,
                Err(err) => {
                    return json_error_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("failed to open audio file: {}", err),
                    )
                }
            };
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime.to_string()),
                    (header::CONTENT_LENGTH, file_size.to_string()),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                    (header::CACHE_CONTROL, STREAM_CACHE_CONTROL.to_string()),
                ],
                Body::from_stream(ReaderStream::new(file)),
            )
                .into_response()
        }
        RangeSpec::Partial { start, end } => {
            let chunk_size = end - start + 1;
            let mut file = match tokio::fs::File::open(&track.file_path).await {
                Ok(file) => file,
                Err(err) => {
                    return json_error_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("failed to open audio file: {}", err),
                    )
                }
            };
            if let Err(err) = file.seek(SeekFrom::Start(start)).await {
                return json_error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("failed to seek audio file: {}", err),
                );
            }
            let window = file.take(chunk_size);
            (
                StatusCode::PARTIAL_CONTENT,
                [
                    (
                        header::CONTENT_RANGE,
                        format!("bytes {}-{}/{}", start, end, file_size),
                    ),
                    (header::CONTENT_TYPE, mime.to_string()),
                    (header::CONTENT_LENGTH, chunk_size.to_string()),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                    (header::CACHE_CONTROL, STREAM_CACHE_CONTROL.to_string()),
                ],
                Body::from_stream(ReaderStream::new(window)),
            )
                .into_response()
        }
        RangeSpec::Unsatisfiable => (
            StatusCode::RANGE_NOT_SATISFIABLE,
            [(header::CONTENT_RANGE, format!("bytes */{}", file_size))],
            Body::empty(),
        )
            .into_response(),
    }
}

/// `GET /tracks/:id/cover`: embedded artwork, or a placeholder image.
pub async fn get_cover(
    State(state): State<AppState>,
    AxumPath(track_id): AxumPath<String>,
) -> Response {
    let track = match lookup_track(&state, &track_id) {
        Ok(track) => track,
        Err(response) => return response,
    };

    let path = std::path::PathBuf::from(&track.file_path);
    let cover = tokio::task::spawn_blocking(move || metadata::read_cover(&path))
        .await
        .ok()
        .and_then(|result| result.ok())
        .flatten();

    match cover {
        Some(cover) => {
            let mime = cover.mime.unwrap_or_else(|| "image/jpeg".to_string());
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime),
                    (header::CACHE_CONTROL, COVER_CACHE_CONTROL.to_string()),
                ],
                Body::from(Bytes::from(cover.data)),
            )
                .into_response()
        }
        None => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "image/svg+xml".to_string()),
                (header::CACHE_CONTROL, PLACEHOLDER_CACHE_CONTROL.to_string()),
            ],
            Body::from(PLACEHOLDER_COVER_SVG),
        )
            .into_response(),
    }
}

fn lookup_track(state: &AppState, track_id: &str) -> Result<Track, Response> {
    match state.library.get_track(track_id) {
        Ok(Some(track)) => Ok(track),
        Ok(None) => Err(json_error_response(
            StatusCode::NOT_FOUND,
            "track not found",
        )),
        Err(err) => Err(json_error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("library error: {}", err),
        )),
    }
}

fn spawn_play_count_increment(state: &AppState, track_id: &str) {
    let library = state.library.clone();
    let track_id = track_id.to_string();
    tokio::task::spawn_blocking(move || {
        if let Err(err) = library.increment_play_count(&track_id) {
            warn!("play count increment failed for {}: {}", track_id, err);
        }
    });
}
