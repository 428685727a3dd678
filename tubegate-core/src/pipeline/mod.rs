//! Request-to-stream pipeline.
//!
//! `VideoService` is the entry point used by the HTTP surface. It resolves
//! the caller's video reference, asks the extractor for the video, and either
//! shapes metadata or opens a chunked stream source.

pub mod download;
pub mod metadata;

use std::sync::Arc;

use tracing::{error, warn};

use crate::config::{PipelineConfig, TubegateConfig};
use crate::extractor::{ExtractedVideo, ExtractorError, VideoExtractor, extractor_for_mode};
use crate::mode::RuntimeMode;
use crate::validation::resolve_video_id;
use crate::{PipelineError, Result};

pub use download::{DOWNLOAD_CONTENT_TYPE, StreamSource, derive_filename};
pub use metadata::{StreamDescriptor, VideoMetadata};

/// Video metadata and download service shared by all requests.
///
/// Holds no per-request state; cloning is cheap.
#[derive(Debug, Clone)]
pub struct VideoService {
    extractor: Arc<dyn VideoExtractor>,
    config: Arc<PipelineConfig>,
}

impl VideoService {
    /// Creates a service over an explicit extractor.
    pub fn new(extractor: Arc<dyn VideoExtractor>, config: PipelineConfig) -> Self {
        Self {
            extractor,
            config: Arc::new(config),
        }
    }

    /// Creates a service with the extractor matching the runtime mode.
    ///
    /// # Errors
    /// - `ExtractorError::ToolUnavailable` - Production extractor could not be initialized
    pub fn from_runtime_mode(
        mode: RuntimeMode,
        config: &TubegateConfig,
    ) -> std::result::Result<Self, ExtractorError> {
        let extractor = extractor_for_mode(mode, config)?;
        Ok(Self::new(extractor, config.pipeline.clone()))
    }

    /// Pipeline limits in effect.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Name of the active extractor.
    pub fn extractor_name(&self) -> &'static str {
        self.extractor.name()
    }

    /// Returns metadata and progressive MP4 renditions for a video.
    ///
    /// `video` may be a bare ID or a YouTube URL.
    ///
    /// # Errors
    /// - `PipelineError::Validation` - Bad reference, over-long, restricted or unavailable video
    /// - `PipelineError::Upstream` - Extraction machinery failed
    pub async fn get_video_info(&self, video: &str) -> Result<VideoMetadata> {
        let video_id = resolve_video_id(video, &self.config)?;
        metadata::get_video_info(self.extractor.as_ref(), &self.config, &video_id).await
    }

    /// Opens a chunked byte source for one rendition of a video.
    ///
    /// # Errors
    /// - `PipelineError::Validation` - Bad reference, unknown handle, restricted or unavailable
    ///   video
    /// - `PipelineError::Upstream` - Extraction machinery or media host failed
    pub async fn open_stream(&self, video: &str, itag: &str) -> Result<StreamSource> {
        let video_id = resolve_video_id(video, &self.config)?;
        download::open_stream(self.extractor.as_ref(), &self.config, &video_id, itag.trim()).await
    }
}

/// Fetches a video and enforces the duration ceiling.
pub(crate) async fn fetch_checked_video(
    extractor: &dyn VideoExtractor,
    config: &PipelineConfig,
    video_id: &str,
) -> Result<ExtractedVideo> {
    let video = extractor
        .fetch_video(video_id)
        .await
        .map_err(|e| map_extractor_error(extractor, video_id, e))?;

    if video.duration_secs > config.max_duration_secs {
        warn!(
            "Rejecting {}: duration {}s exceeds limit {}s",
            video_id, video.duration_secs, config.max_duration_secs
        );
        return Err(PipelineError::validation(format!(
            "duration exceeds limit ({} minutes)",
            config.max_duration_secs / 60
        )));
    }

    Ok(video)
}

/// Translates extractor failures into the two-tier pipeline taxonomy.
///
/// Every failure is logged with full detail; only validation messages
/// reach the caller.
pub(crate) fn map_extractor_error(
    extractor: &dyn VideoExtractor,
    video_id: &str,
    error: ExtractorError,
) -> PipelineError {
    match error {
        ExtractorError::AgeRestricted { .. } => {
            warn!("[{}] {}: {}", extractor.name(), video_id, error);
            PipelineError::validation("age-restricted, cannot download")
        }
        ExtractorError::Unavailable { .. } => {
            warn!("[{}] {}: {}", extractor.name(), video_id, error);
            PipelineError::validation("video unavailable or deleted")
        }
        ExtractorError::Failed { reason } => {
            error!("[{}] failed to process {}: {}", extractor.name(), video_id, reason);
            PipelineError::validation(format!("error processing video: {reason}"))
        }
        ExtractorError::ToolUnavailable { .. }
        | ExtractorError::Malformed { .. }
        | ExtractorError::Transport { .. } => {
            error!("[{}] extractor fault for {}: {}", extractor.name(), video_id, error);
            PipelineError::upstream(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::ScriptedExtractor;
    use crate::extractor::scripted::{fixture_stream, fixture_video};

    fn service_with(extractor: ScriptedExtractor) -> VideoService {
        VideoService::new(Arc::new(extractor), PipelineConfig::default())
    }

    #[tokio::test]
    async fn test_failure_mapping() {
        let extractor = ScriptedExtractor::new()
            .with_failure(
                "ageRestrict",
                ExtractorError::AgeRestricted {
                    video_id: "ageRestrict".to_string(),
                },
            )
            .with_failure(
                "failedVideo",
                ExtractorError::Failed {
                    reason: "HTTP Error 429".to_string(),
                },
            )
            .with_failure(
                "brokenTool0",
                ExtractorError::ToolUnavailable {
                    reason: "No such file or directory".to_string(),
                },
            );
        let service = service_with(extractor);

        assert_eq!(
            service.get_video_info("ageRestrict").await,
            Err(PipelineError::validation("age-restricted, cannot download"))
        );
        assert_eq!(
            service.get_video_info("goneForever").await,
            Err(PipelineError::validation("video unavailable or deleted"))
        );
        assert_eq!(
            service.get_video_info("failedVideo").await,
            Err(PipelineError::validation("error processing video: HTTP Error 429"))
        );

        let error = service.get_video_info("brokenTool0").await.unwrap_err();
        assert!(!error.is_user_error());
        assert_eq!(error.user_message(), "internal server error");
    }

    #[tokio::test]
    async fn test_accepts_urls_and_rejects_foreign_ones() {
        let video = fixture_video(
            "dQw4w9WgXcQ",
            "Sample",
            60,
            vec![fixture_stream("18", "360p", "video/mp4", true, Some(10))],
        );
        let service = service_with(ScriptedExtractor::new().with_video(video));

        let metadata = service
            .get_video_info("https://youtu.be/dQw4w9WgXcQ")
            .await
            .unwrap();
        assert_eq!(metadata.title, "Sample");

        assert_eq!(
            service.get_video_info("https://vimeo.com/12345").await,
            Err(PipelineError::validation("invalid YouTube URL"))
        );
    }

    #[test]
    fn test_from_runtime_mode() {
        let config = TubegateConfig::for_development();
        let service = VideoService::from_runtime_mode(config.runtime_mode, &config).unwrap();
        assert_eq!(service.extractor_name(), "development");
        assert_eq!(service.config().max_duration_secs, 3600);
    }
}
