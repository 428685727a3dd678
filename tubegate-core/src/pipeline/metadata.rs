//! Metadata responder: shapes extractor output into the public descriptor list.

use std::cmp::Reverse;

use serde::Serialize;
use tracing::debug;

use super::fetch_checked_video;
use crate::Result;
use crate::config::PipelineConfig;
use crate::extractor::{ExtractedStream, ExtractedVideo, VideoExtractor};

/// Video details returned by `GET /api/video-info`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoMetadata {
    pub title: String,
    pub author: String,
    /// Length in whole seconds
    pub duration: u64,
    pub thumbnail_url: String,
    /// Progressive MP4 renditions, highest resolution first
    pub streams: Vec<StreamDescriptor>,
}

/// One downloadable rendition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamDescriptor {
    /// Handle passed back as the `resolution` download parameter
    pub itag: String,
    pub resolution: Option<String>,
    pub filesize: Option<u64>,
    pub fps: Option<u32>,
    /// Uppercase container name, e.g. `MP4`
    #[serde(rename = "type")]
    pub container: String,
}

impl From<&ExtractedStream> for StreamDescriptor {
    fn from(stream: &ExtractedStream) -> Self {
        Self {
            itag: stream.itag.clone(),
            resolution: stream.resolution.clone(),
            filesize: stream.filesize,
            fps: stream.fps,
            container: stream
                .mime_subtype()
                .map(str::to_uppercase)
                .unwrap_or_default(),
        }
    }
}

/// Resolves a video and returns its metadata with sorted descriptors.
///
/// # Errors
/// - `PipelineError::Validation` - Duration over the ceiling, restricted or unavailable video
/// - `PipelineError::Upstream` - Extraction machinery failed
pub async fn get_video_info(
    extractor: &dyn VideoExtractor,
    config: &PipelineConfig,
    video_id: &str,
) -> Result<VideoMetadata> {
    let video = fetch_checked_video(extractor, config, video_id).await?;

    let streams: Vec<StreamDescriptor> = downloadable_streams(&video)
        .into_iter()
        .map(StreamDescriptor::from)
        .collect();

    debug!(
        "Resolved {} with {} downloadable streams out of {}",
        video_id,
        streams.len(),
        video.streams.len()
    );

    Ok(VideoMetadata {
        title: video.title,
        author: video.author,
        duration: video.duration_secs,
        thumbnail_url: video.thumbnail_url,
        streams,
    })
}

/// Progressive MP4 streams of a video, highest resolution first.
///
/// Streams whose resolution has no numeric height keep the extractor's
/// ordering and follow the ones that do.
pub(crate) fn downloadable_streams(video: &ExtractedVideo) -> Vec<&ExtractedStream> {
    let mut streams: Vec<&ExtractedStream> = video
        .streams
        .iter()
        .filter(|stream| stream.is_progressive() && stream.is_mp4())
        .collect();

    streams.sort_by_key(|stream| Reverse(stream.resolution.as_deref().and_then(resolution_height)));
    streams
}

/// Parses the pixel height out of a resolution label.
///
/// Accepts `720p`, `720p60`, `1080p HDR` and `1280x720` forms.
pub fn resolution_height(label: &str) -> Option<u32> {
    let label = label.trim();
    if let Some((_, height)) = label.split_once(['x', 'X']) {
        return leading_number(height);
    }
    let digits_end = label
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(label.len());
    if digits_end == 0 || !label[digits_end..].starts_with('p') {
        return None;
    }
    label[..digits_end].parse().ok()
}

fn leading_number(text: &str) -> Option<u32> {
    let digits: String = text.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PipelineError;
    use crate::extractor::ScriptedExtractor;
    use crate::extractor::scripted::{fixture_stream, fixture_video};

    fn sample_video(duration_secs: u64) -> ExtractedVideo {
        fixture_video(
            "dQw4w9WgXcQ",
            "Sample Video",
            duration_secs,
            vec![
                fixture_stream("18", "360p", "video/mp4", true, Some(1_000)),
                fixture_stream("137", "1080p", "video/mp4", false, Some(9_000)),
                fixture_stream("22", "720p", "video/mp4; codecs=\"avc1\"", true, None),
                fixture_stream("43", "480p", "video/webm", true, Some(2_000)),
                fixture_stream("36", "240p", "video/mp4", true, Some(500)),
                fixture_stream("99", "", "video/mp4", true, Some(42)),
                fixture_stream("37", "1080p60", "video/mp4", true, Some(12_000)),
            ],
        )
    }

    #[tokio::test]
    async fn test_descriptors_sorted_and_filtered() {
        let extractor = ScriptedExtractor::new().with_video(sample_video(300));
        let config = PipelineConfig::default();

        let metadata = get_video_info(&extractor, &config, "dQw4w9WgXcQ")
            .await
            .unwrap();

        let itags: Vec<&str> = metadata.streams.iter().map(|s| s.itag.as_str()).collect();
        assert_eq!(itags, vec!["37", "22", "18", "36", "99"]);
        assert!(metadata.streams.iter().all(|s| s.container == "MP4"));
        assert_eq!(metadata.duration, 300);
        assert_eq!(metadata.author, "Fixture Author");
        assert_eq!(metadata.streams[1].filesize, None);
    }

    #[tokio::test]
    async fn test_repeated_calls_are_identical() {
        let extractor = ScriptedExtractor::new().with_video(sample_video(300));
        let config = PipelineConfig::default();

        let first = get_video_info(&extractor, &config, "dQw4w9WgXcQ").await.unwrap();
        let second = get_video_info(&extractor, &config, "dQw4w9WgXcQ").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_duration_ceiling() {
        let config = PipelineConfig::default();

        let extractor = ScriptedExtractor::new().with_video(sample_video(3601));
        let result = get_video_info(&extractor, &config, "dQw4w9WgXcQ").await;
        assert_eq!(
            result,
            Err(PipelineError::validation("duration exceeds limit (60 minutes)"))
        );

        let extractor = ScriptedExtractor::new().with_video(sample_video(3600));
        assert!(get_video_info(&extractor, &config, "dQw4w9WgXcQ").await.is_ok());
    }

    #[test]
    fn test_serialized_shape() {
        let descriptor = StreamDescriptor {
            itag: "22".to_string(),
            resolution: Some("720p".to_string()),
            filesize: Some(1234),
            fps: Some(30),
            container: "MP4".to_string(),
        };

        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "itag": "22",
                "resolution": "720p",
                "filesize": 1234,
                "fps": 30,
                "type": "MP4"
            })
        );
    }

    #[test]
    fn test_resolution_height() {
        assert_eq!(resolution_height("720p"), Some(720));
        assert_eq!(resolution_height("1080p60"), Some(1080));
        assert_eq!(resolution_height("2160p HDR"), Some(2160));
        assert_eq!(resolution_height("1280x720"), Some(720));
        assert_eq!(resolution_height("hd720"), None);
        assert_eq!(resolution_height("audio only"), None);
        assert_eq!(resolution_height(""), None);
    }
}
