//! Offline extractor serving a fixed catalogue of synthetic videos.
//!
//! Lets the HTTP surface run end to end without yt-dlp or network access.
//! Byte content is generated on demand, so large renditions cost no memory.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream};

use super::{ExtractedStream, ExtractedVideo, ExtractorError, OpenedStream, VideoExtractor};

/// Size of each generated chunk.
const GENERATED_CHUNK_SIZE: usize = 64 * 1024;

/// Catalogue ID that reports an age restriction.
pub const AGE_RESTRICTED_VIDEO_ID: &str = "AgeLimited1";

/// Catalogue ID that reports a deleted video.
pub const DELETED_VIDEO_ID: &str = "DeletedVid0";

/// Development extractor with built-in sample videos.
#[derive(Debug, Clone)]
pub struct DevelopmentExtractor {
    catalogue: Vec<ExtractedVideo>,
}

impl DevelopmentExtractor {
    /// Creates the extractor with its default catalogue.
    pub fn new() -> Self {
        Self {
            catalogue: vec![
                ExtractedVideo {
                    video_id: "dQw4w9WgXcQ".to_string(),
                    title: "Development Sample: Never Gonna Stream".to_string(),
                    author: "Tubegate Samples".to_string(),
                    duration_secs: 212,
                    thumbnail_url: "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg"
                        .to_string(),
                    streams: vec![
                        sample_stream("18", "360p", 3 * 1024 * 1024 + 123, "video/mp4", true, true),
                        sample_stream("137", "1080p", 9 * 1024 * 1024, "video/mp4", true, false),
                        sample_stream("22", "720p", 5 * 1024 * 1024 + 77, "video/mp4", true, true),
                        sample_stream("43", "360p", 2 * 1024 * 1024, "video/webm", true, true),
                        sample_stream("140", "", 1024 * 1024, "audio/mp4", false, true),
                    ],
                },
                ExtractedVideo {
                    video_id: "LongLecture".to_string(),
                    title: "Development Sample: Two Hour Lecture".to_string(),
                    author: "Tubegate Samples".to_string(),
                    duration_secs: 7200,
                    thumbnail_url: "https://i.ytimg.com/vi/LongLecture/hqdefault.jpg".to_string(),
                    streams: vec![sample_stream(
                        "18",
                        "360p",
                        64 * 1024 * 1024,
                        "video/mp4",
                        true,
                        true,
                    )],
                },
            ],
        }
    }

    fn find(&self, video_id: &str) -> Option<&ExtractedVideo> {
        self.catalogue.iter().find(|video| video.video_id == video_id)
    }
}

impl Default for DevelopmentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VideoExtractor for DevelopmentExtractor {
    fn name(&self) -> &'static str {
        "development"
    }

    async fn fetch_video(&self, video_id: &str) -> Result<ExtractedVideo, ExtractorError> {
        match video_id {
            AGE_RESTRICTED_VIDEO_ID => Err(ExtractorError::AgeRestricted {
                video_id: video_id.to_string(),
            }),
            DELETED_VIDEO_ID => Err(ExtractorError::Unavailable {
                video_id: video_id.to_string(),
            }),
            _ => self
                .find(video_id)
                .cloned()
                .ok_or_else(|| ExtractorError::Unavailable {
                    video_id: video_id.to_string(),
                }),
        }
    }

    async fn open_stream(
        &self,
        _video: &ExtractedVideo,
        stream: &ExtractedStream,
    ) -> Result<OpenedStream, ExtractorError> {
        let total = stream.filesize.ok_or_else(|| ExtractorError::Failed {
            reason: format!("stream {} has no sample size", stream.itag),
        })?;

        Ok(OpenedStream {
            bytes: synthetic_bytes(total).boxed(),
            content_length: Some(total),
        })
    }
}

fn sample_stream(
    itag: &str,
    resolution: &str,
    filesize: u64,
    mime_type: &str,
    has_video: bool,
    has_audio: bool,
) -> ExtractedStream {
    ExtractedStream {
        itag: itag.to_string(),
        resolution: (!resolution.is_empty()).then(|| resolution.to_string()),
        filesize: Some(filesize),
        fps: has_video.then_some(30),
        mime_type: mime_type.to_string(),
        has_video,
        has_audio,
        locator: None,
        request_headers: Vec::new(),
    }
}

/// Generates `total` bytes of a repeating pattern in fixed-size chunks.
fn synthetic_bytes(
    total: u64,
) -> impl futures::Stream<Item = Result<Bytes, ExtractorError>> + Send + 'static {
    stream::unfold(0u64, move |offset| async move {
        if offset >= total {
            return None;
        }
        let length = std::cmp::min(GENERATED_CHUNK_SIZE as u64, total - offset);
        let chunk: Vec<u8> = (offset..offset + length)
            .map(|position| (position % 251) as u8)
            .collect();
        Some((Ok(Bytes::from(chunk)), offset + length))
    })
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;

    use super::*;

    #[tokio::test]
    async fn test_catalogue_lookup() {
        let extractor = DevelopmentExtractor::new();

        let video = extractor.fetch_video("dQw4w9WgXcQ").await.unwrap();
        assert_eq!(video.duration_secs, 212);
        assert_eq!(video.streams.len(), 5);

        assert!(matches!(
            extractor.fetch_video(AGE_RESTRICTED_VIDEO_ID).await,
            Err(ExtractorError::AgeRestricted { .. })
        ));
        assert!(matches!(
            extractor.fetch_video(DELETED_VIDEO_ID).await,
            Err(ExtractorError::Unavailable { .. })
        ));
        assert!(matches!(
            extractor.fetch_video("missingVid0").await,
            Err(ExtractorError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_synthetic_stream_matches_declared_size() {
        let extractor = DevelopmentExtractor::new();
        let video = extractor.fetch_video("dQw4w9WgXcQ").await.unwrap();
        let stream = video.streams.iter().find(|s| s.itag == "18").unwrap();

        let opened = extractor.open_stream(&video, stream).await.unwrap();
        assert_eq!(opened.content_length, Some(3 * 1024 * 1024 + 123));

        let chunks: Vec<Bytes> = opened.bytes.try_collect().await.unwrap();
        let total: usize = chunks.iter().map(Bytes::len).sum();
        assert_eq!(total as u64, 3 * 1024 * 1024 + 123);
        assert_eq!(chunks[0][0], 0);
        assert_eq!(chunks[0][251], 0);
        assert_eq!(chunks[0][252], 1);
    }
}
