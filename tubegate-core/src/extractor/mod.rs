//! Extractor implementations for resolving YouTube videos.
//!
//! The extractor is the hard boundary between Tubegate and YouTube's delivery
//! system. It turns a video ID into metadata plus stream descriptors, and a
//! chosen descriptor into a byte stream. Everything behind this trait is an
//! external concern.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::config::TubegateConfig;
use crate::mode::RuntimeMode;

pub mod development;
#[cfg(any(test, feature = "test-utils"))]
pub mod scripted;
pub mod ytdlp;

pub use development::DevelopmentExtractor;
#[cfg(any(test, feature = "test-utils"))]
pub use scripted::ScriptedExtractor;
pub use ytdlp::YtDlpExtractor;

/// Byte stream produced by an extractor for one rendition.
pub type ByteStream = BoxStream<'static, Result<Bytes, ExtractorError>>;

/// Errors reported by extractor implementations.
///
/// The first three variants describe the video itself; the rest describe a
/// fault in the extraction machinery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractorError {
    /// Video requires age verification.
    #[error("video {video_id} is age-restricted")]
    AgeRestricted {
        /// The requested video
        video_id: String,
    },

    /// Video is private, removed or never existed.
    #[error("video {video_id} is unavailable")]
    Unavailable {
        /// The requested video
        video_id: String,
    },

    /// Extraction backend refused or failed to process the video.
    #[error("{reason}")]
    Failed {
        /// Backend-provided detail
        reason: String,
    },

    /// Extraction backend could not be launched.
    #[error("extractor tool unavailable: {reason}")]
    ToolUnavailable {
        /// Launch failure detail
        reason: String,
    },

    /// Extraction backend produced output that could not be understood.
    #[error("malformed extractor output: {reason}")]
    Malformed {
        /// Parse failure detail
        reason: String,
    },

    /// Network failure while talking to the media host.
    #[error("transport error: {reason}")]
    Transport {
        /// Transport failure detail
        reason: String,
    },
}

/// Video details as reported by an extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedVideo {
    pub video_id: String,
    pub title: String,
    pub author: String,
    pub duration_secs: u64,
    pub thumbnail_url: String,
    pub streams: Vec<ExtractedStream>,
}

/// One rendition of a video as reported by an extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedStream {
    /// Opaque per-video handle (YouTube itag / yt-dlp format id)
    pub itag: String,
    /// Resolution label such as `720p`
    pub resolution: Option<String>,
    /// Approximate size in bytes, when known
    pub filesize: Option<u64>,
    pub fps: Option<u32>,
    /// MIME type, possibly with codec parameters
    pub mime_type: String,
    pub has_video: bool,
    pub has_audio: bool,
    /// Extractor-private locator for the bytes (usually a signed URL)
    pub locator: Option<String>,
    /// Headers the media host expects on the byte request
    pub request_headers: Vec<(String, String)>,
}

impl ExtractedStream {
    /// Checks if the stream carries both audio and video.
    pub fn is_progressive(&self) -> bool {
        self.has_video && self.has_audio
    }

    /// Returns the MIME subtype without parameters (`video/mp4; codecs=..` → `mp4`).
    pub fn mime_subtype(&self) -> Option<&str> {
        let essence = self.mime_type.split(';').next()?.trim();
        let (_, subtype) = essence.split_once('/')?;
        (!subtype.is_empty()).then_some(subtype)
    }

    /// Checks if the stream uses the MP4 container.
    pub fn is_mp4(&self) -> bool {
        self.mime_subtype()
            .is_some_and(|subtype| subtype.eq_ignore_ascii_case("mp4"))
    }
}

/// Byte source opened for a rendition.
pub struct OpenedStream {
    pub bytes: ByteStream,
    /// Total size reported by the media host, when known
    pub content_length: Option<u64>,
}

impl std::fmt::Debug for OpenedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedStream")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Trait for video extractors.
///
/// Implementations resolve videos through different backends (yt-dlp, the
/// offline development catalogue, scripted fixtures for tests).
#[async_trait]
pub trait VideoExtractor: Send + Sync + std::fmt::Debug {
    /// Name of the extractor (for logging)
    fn name(&self) -> &'static str;

    /// Resolves a video ID to metadata and the list of renditions.
    ///
    /// # Errors
    /// - `ExtractorError::AgeRestricted` - Video is age-gated
    /// - `ExtractorError::Unavailable` - Video is private, deleted or unknown
    /// - `ExtractorError::Failed` - Backend reported another failure
    /// - `ExtractorError::ToolUnavailable`, `Malformed`, `Transport` - Extraction machinery fault
    async fn fetch_video(&self, video_id: &str) -> Result<ExtractedVideo, ExtractorError>;

    /// Opens the byte stream of a rendition previously returned by `fetch_video`.
    ///
    /// # Errors
    /// - `ExtractorError::Transport` - Media host could not be reached or refused the request
    /// - `ExtractorError::Failed` - Rendition cannot be fetched
    async fn open_stream(
        &self,
        video: &ExtractedVideo,
        stream: &ExtractedStream,
    ) -> Result<OpenedStream, ExtractorError>;
}

/// Creates the extractor matching the runtime mode.
///
/// # Errors
/// - `ExtractorError::ToolUnavailable` - HTTP client for the production extractor could not be
///   built
pub fn extractor_for_mode(
    mode: RuntimeMode,
    config: &TubegateConfig,
) -> Result<Arc<dyn VideoExtractor>, ExtractorError> {
    let extractor: Arc<dyn VideoExtractor> = match mode {
        RuntimeMode::Production => Arc::new(YtDlpExtractor::new(config.extractor.clone())?),
        RuntimeMode::Development => Arc::new(DevelopmentExtractor::new()),
    };
    Ok(extractor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_with_mime(mime_type: &str) -> ExtractedStream {
        ExtractedStream {
            itag: "18".to_string(),
            resolution: Some("360p".to_string()),
            filesize: None,
            fps: Some(30),
            mime_type: mime_type.to_string(),
            has_video: true,
            has_audio: true,
            locator: None,
            request_headers: Vec::new(),
        }
    }

    #[test]
    fn test_mime_subtype() {
        assert_eq!(stream_with_mime("video/mp4").mime_subtype(), Some("mp4"));
        assert_eq!(
            stream_with_mime("video/mp4; codecs=\"avc1.42001E, mp4a.40.2\"").mime_subtype(),
            Some("mp4")
        );
        assert_eq!(stream_with_mime("video/webm").mime_subtype(), Some("webm"));
        assert_eq!(stream_with_mime("garbage").mime_subtype(), None);
        assert_eq!(stream_with_mime("video/").mime_subtype(), None);
    }

    #[test]
    fn test_stream_classification() {
        let mut stream = stream_with_mime("video/MP4");
        assert!(stream.is_mp4());
        assert!(stream.is_progressive());

        stream.has_audio = false;
        assert!(!stream.is_progressive());
        assert!(!stream_with_mime("video/webm").is_mp4());
    }
}
