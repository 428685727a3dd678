//! API handlers for video metadata and downloads

use axum::Json;
use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{Response, StatusCode, header};
use serde::Deserialize;
use tracing::info;
use tubegate_core::VideoMetadata;
use tubegate_core::pipeline::DOWNLOAD_CONTENT_TYPE;

use crate::errors::ApiError;
use crate::server::AppState;

/// Query parameters for `GET /api/video-info`.
#[derive(Debug, Deserialize)]
pub struct VideoInfoQuery {
    /// Video ID or YouTube URL
    pub video_id: Option<String>,
}

/// Query parameters for `GET /api/download`.
#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    /// Video ID or YouTube URL
    pub video_id: Option<String>,
    /// Stream handle (`itag`) from the metadata response
    pub resolution: Option<String>,
}

/// Returns metadata and downloadable streams for a video.
///
/// # Errors
/// - `ApiError::MissingVideoId` - `video_id` absent or empty
/// - `ApiError::Pipeline` - Video rejected or extraction failed
pub async fn api_video_info(
    State(state): State<AppState>,
    query: Result<Query<VideoInfoQuery>, QueryRejection>,
) -> Result<Json<VideoMetadata>, ApiError> {
    let Query(query) = query.map_err(invalid_query)?;
    let video_id = present(query.video_id).ok_or(ApiError::MissingVideoId)?;

    info!("Video info requested for {}", video_id);
    let metadata = state.videos.get_video_info(&video_id).await?;

    Ok(Json(metadata))
}

/// Streams one progressive MP4 rendition of a video.
///
/// The body is produced chunk by chunk from the upstream source while the
/// client reads it. `Content-Length` is sent only when the size is known.
///
/// # Errors
/// - `ApiError::MissingParameters` - `video_id` or `resolution` absent or empty
/// - `ApiError::Pipeline` - Video or handle rejected, or extraction failed
/// - `ApiError::Internal` - Response headers could not be built
pub async fn api_download(
    State(state): State<AppState>,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<Response<Body>, ApiError> {
    let Query(query) = query.map_err(invalid_query)?;
    let (Some(video_id), Some(itag)) = (present(query.video_id), present(query.resolution)) else {
        return Err(ApiError::MissingParameters);
    };

    info!("Download requested for {} itag {}", video_id, itag);
    let source = state.videos.open_stream(&video_id, &itag).await?;

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, DOWNLOAD_CONTENT_TYPE)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(source.filename()),
        )
        .header(header::ACCEPT_RANGES, "bytes");

    if let Some(total_size) = source.total_size() {
        response = response.header(header::CONTENT_LENGTH, total_size.to_string());
    }

    response
        .body(Body::from_stream(source.into_chunks()))
        .map_err(|e| ApiError::Internal {
            reason: format!("failed to build download response: {e}"),
        })
}

/// Builds an attachment disposition.
///
/// Non-ASCII names get an ASCII fallback plus an RFC 5987 `filename*`.
pub fn content_disposition(filename: &str) -> String {
    if filename.is_ascii() {
        return format!("attachment; filename={filename}");
    }

    let fallback: String = filename
        .chars()
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect();
    format!(
        "attachment; filename={fallback}; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    )
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn invalid_query(rejection: QueryRejection) -> ApiError {
    ApiError::InvalidQuery {
        reason: rejection.body_text(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition("Foo Bar Baz_720p.mp4"),
            "attachment; filename=Foo Bar Baz_720p.mp4"
        );
        assert_eq!(
            content_disposition("Déjà vu_360p.mp4"),
            "attachment; filename=D_j_ vu_360p.mp4; filename*=UTF-8''D%C3%A9j%C3%A0%20vu_360p.mp4"
        );
    }

    #[test]
    fn test_present_treats_blank_as_missing() {
        assert_eq!(present(None), None);
        assert_eq!(present(Some(String::new())), None);
        assert_eq!(present(Some("   ".to_string())), None);
        assert_eq!(present(Some(" 22 ".to_string())), Some("22".to_string()));
    }
}
