//! yt-dlp backed extractor.
//!
//! Metadata comes from `yt-dlp --dump-single-json`; stream bytes are pulled
//! directly from the format URL yt-dlp resolved, so nothing touches disk.

use std::collections::HashMap;
use std::process::Stdio;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{ExtractedStream, ExtractedVideo, ExtractorError, OpenedStream, VideoExtractor};
use crate::config::ExtractorConfig;

/// Markers yt-dlp prints for age-gated videos.
const AGE_RESTRICTED_MARKERS: &[&str] = &[
    "sign in to confirm your age",
    "age-restricted",
    "age restricted",
    "inappropriate for some users",
];

/// Markers yt-dlp prints for private, removed or unknown videos.
const UNAVAILABLE_MARKERS: &[&str] = &[
    "video unavailable",
    "this video is unavailable",
    "this video has been removed",
    "private video",
    "this video is private",
    "does not exist",
    "incomplete youtube id",
];

/// Top-level `yt-dlp --dump-single-json` payload. Only the fields Tubegate
/// reads are declared.
#[derive(Debug, Deserialize)]
struct YtDlpVideo {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    formats: Vec<YtDlpFormat>,
}

#[derive(Debug, Deserialize)]
struct YtDlpFormat {
    format_id: String,
    #[serde(default)]
    ext: Option<String>,
    #[serde(default)]
    vcodec: Option<String>,
    #[serde(default)]
    acodec: Option<String>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    format_note: Option<String>,
    #[serde(default)]
    fps: Option<f64>,
    #[serde(default)]
    filesize: Option<u64>,
    #[serde(default)]
    filesize_approx: Option<u64>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    protocol: Option<String>,
    #[serde(default)]
    http_headers: HashMap<String, String>,
}

impl YtDlpFormat {
    fn has_codec(codec: &Option<String>) -> bool {
        codec
            .as_deref()
            .is_some_and(|codec| !codec.is_empty() && codec != "none")
    }

    /// Only plain HTTP(S) renditions can be proxied byte-for-byte.
    fn is_direct_download(&self) -> bool {
        matches!(self.protocol.as_deref(), None | Some("http") | Some("https"))
    }

    fn resolution_label(&self) -> Option<String> {
        let from_note = self.format_note.as_deref().filter(|note| {
            note.ends_with('p') && note.chars().next().is_some_and(|c| c.is_ascii_digit())
        });
        match (from_note, self.height) {
            (Some(note), _) => Some(note.to_string()),
            (None, Some(height)) => Some(format!("{height}p")),
            (None, None) => None,
        }
    }

    fn into_stream(self) -> ExtractedStream {
        let has_video = Self::has_codec(&self.vcodec);
        let has_audio = Self::has_codec(&self.acodec);
        let ext = self.ext.clone().unwrap_or_else(|| "mp4".to_string());
        let media_kind = if has_video { "video" } else { "audio" };
        let resolution = self.resolution_label();

        ExtractedStream {
            itag: self.format_id,
            resolution,
            filesize: self.filesize.or(self.filesize_approx),
            fps: self.fps.map(|fps| fps.round() as u32),
            mime_type: format!("{media_kind}/{ext}"),
            has_video,
            has_audio,
            locator: self.url,
            request_headers: self.http_headers.into_iter().collect(),
        }
    }
}

/// Extractor that shells out to the yt-dlp binary.
#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    config: ExtractorConfig,
    http: reqwest::Client,
}

impl YtDlpExtractor {
    /// Creates a new extractor using the given configuration.
    ///
    /// # Errors
    /// - `ExtractorError::ToolUnavailable` - HTTP client could not be built
    pub fn new(config: ExtractorConfig) -> Result<Self, ExtractorError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| ExtractorError::ToolUnavailable {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { config, http })
    }

    fn build_args(&self, video_id: &str) -> Vec<String> {
        vec![
            "--dump-single-json".to_string(),
            "--skip-download".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.config.socket_timeout.as_secs().to_string(),
            "--".to_string(),
            watch_url(video_id),
        ]
    }

    fn parse_video(stdout: &[u8]) -> Result<ExtractedVideo, ExtractorError> {
        let payload: YtDlpVideo =
            serde_json::from_slice(stdout).map_err(|e| ExtractorError::Malformed {
                reason: format!("invalid yt-dlp JSON: {e}"),
            })?;

        let streams = payload
            .formats
            .into_iter()
            .filter(YtDlpFormat::is_direct_download)
            .map(YtDlpFormat::into_stream)
            .collect();

        Ok(ExtractedVideo {
            video_id: payload.id,
            title: payload.title.unwrap_or_else(|| "Untitled".to_string()),
            author: payload
                .uploader
                .or(payload.channel)
                .unwrap_or_else(|| "Unknown".to_string()),
            duration_secs: payload.duration.map(|d| d.max(0.0).round() as u64).unwrap_or(0),
            thumbnail_url: payload.thumbnail.unwrap_or_default(),
            streams,
        })
    }

    fn build_headers(stream: &ExtractedStream) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in &stream.request_headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => debug!("Skipping unusable header from yt-dlp: {}", name),
            }
        }
        if !headers.contains_key(USER_AGENT) {
            headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
        }
        headers
    }
}

#[async_trait]
impl VideoExtractor for YtDlpExtractor {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn fetch_video(&self, video_id: &str) -> Result<ExtractedVideo, ExtractorError> {
        let args = self.build_args(video_id);
        debug!("Running {} {}", self.config.ytdlp_path, args.join(" "));

        let mut command = Command::new(&self.config.ytdlp_path);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.config.extraction_timeout, command.output())
            .await
            .map_err(|_| ExtractorError::Failed {
                reason: format!(
                    "extraction timed out after {}s",
                    self.config.extraction_timeout.as_secs()
                ),
            })?
            .map_err(|e| ExtractorError::ToolUnavailable {
                reason: format!("failed to run {}: {e}", self.config.ytdlp_path),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                "yt-dlp failed for {} ({}): {}",
                video_id,
                output.status,
                stderr.trim()
            );
            return Err(classify_failure(video_id, &stderr));
        }

        Self::parse_video(&output.stdout)
    }

    async fn open_stream(
        &self,
        video: &ExtractedVideo,
        stream: &ExtractedStream,
    ) -> Result<OpenedStream, ExtractorError> {
        let url = stream
            .locator
            .as_deref()
            .ok_or_else(|| ExtractorError::Failed {
                reason: format!("stream {} of {} has no direct URL", stream.itag, video.video_id),
            })?;

        let response = self
            .http
            .get(url)
            .headers(Self::build_headers(stream))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ExtractorError::Transport {
                reason: e.to_string(),
            })?;

        let content_length = response.content_length();
        let bytes = response
            .bytes_stream()
            .map(|chunk| {
                chunk.map_err(|e| ExtractorError::Transport {
                    reason: e.to_string(),
                })
            })
            .boxed();

        Ok(OpenedStream {
            bytes,
            content_length,
        })
    }
}

/// Builds the canonical watch URL handed to yt-dlp.
fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// Maps yt-dlp's stderr to an extractor error kind.
fn classify_failure(video_id: &str, stderr: &str) -> ExtractorError {
    let lowered = stderr.to_lowercase();

    if AGE_RESTRICTED_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        return ExtractorError::AgeRestricted {
            video_id: video_id.to_string(),
        };
    }

    if UNAVAILABLE_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        return ExtractorError::Unavailable {
            video_id: video_id.to_string(),
        };
    }

    let reason = stderr
        .lines()
        .rev()
        .find_map(|line| line.trim().strip_prefix("ERROR:"))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .unwrap_or_else(|| stderr.trim());

    ExtractorError::Failed {
        reason: if reason.is_empty() {
            "yt-dlp exited without an error message".to_string()
        } else {
            reason.to_string()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_JSON: &str = r#"{
        "id": "dQw4w9WgXcQ",
        "title": "Sample: Video/Title",
        "uploader": "Sample Channel",
        "duration": 212.4,
        "thumbnail": "https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg",
        "formats": [
            {"format_id": "18", "ext": "mp4", "vcodec": "avc1.42001E", "acodec": "mp4a.40.2",
             "height": 360, "format_note": "360p", "fps": 30, "filesize": 1000,
             "url": "https://media.example/18", "protocol": "https",
             "http_headers": {"User-Agent": "yt-dlp-agent"}},
            {"format_id": "137", "ext": "mp4", "vcodec": "avc1.640028", "acodec": "none",
             "height": 1080, "format_note": "1080p", "fps": 29.97,
             "url": "https://media.example/137", "protocol": "https"},
            {"format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a.40.2",
             "url": "https://media.example/140", "protocol": "https"},
            {"format_id": "hls-720", "ext": "mp4", "vcodec": "avc1", "acodec": "mp4a",
             "height": 720, "url": "https://media.example/720.m3u8", "protocol": "m3u8_native"},
            {"format_id": "22", "ext": "mp4", "vcodec": "avc1.64001F", "acodec": "mp4a.40.2",
             "height": 720, "format_note": "hd720", "fps": 30, "filesize_approx": 5000,
             "url": "https://media.example/22", "protocol": "https"}
        ]
    }"#;

    #[test]
    fn test_parse_video_payload() {
        let video = YtDlpExtractor::parse_video(SAMPLE_JSON.as_bytes()).unwrap();

        assert_eq!(video.video_id, "dQw4w9WgXcQ");
        assert_eq!(video.title, "Sample: Video/Title");
        assert_eq!(video.author, "Sample Channel");
        assert_eq!(video.duration_secs, 212);
        // HLS rendition is skipped
        assert_eq!(video.streams.len(), 4);

        let progressive = &video.streams[0];
        assert_eq!(progressive.itag, "18");
        assert_eq!(progressive.resolution.as_deref(), Some("360p"));
        assert_eq!(progressive.mime_type, "video/mp4");
        assert!(progressive.is_progressive());
        assert_eq!(progressive.locator.as_deref(), Some("https://media.example/18"));
        assert_eq!(
            progressive.request_headers,
            vec![("User-Agent".to_string(), "yt-dlp-agent".to_string())]
        );

        let video_only = &video.streams[1];
        assert!(!video_only.is_progressive());
        assert_eq!(video_only.fps, Some(30));

        let audio_only = &video.streams[2];
        assert_eq!(audio_only.mime_type, "audio/m4a");
        assert_eq!(audio_only.resolution, None);

        let approx = &video.streams[3];
        assert_eq!(approx.resolution.as_deref(), Some("720p"));
        assert_eq!(approx.filesize, Some(5000));
    }

    #[test]
    fn test_parse_video_rejects_garbage() {
        let error = YtDlpExtractor::parse_video(b"not json").unwrap_err();
        assert!(matches!(error, ExtractorError::Malformed { .. }));
    }

    #[test]
    fn test_parse_video_defaults() {
        let video = YtDlpExtractor::parse_video(br#"{"id": "abc", "channel": "Chan"}"#).unwrap();
        assert_eq!(video.title, "Untitled");
        assert_eq!(video.author, "Chan");
        assert_eq!(video.duration_secs, 0);
        assert!(video.streams.is_empty());
    }

    #[test]
    fn test_classify_failure() {
        assert_eq!(
            classify_failure(
                "abc",
                "ERROR: [youtube] abc: Sign in to confirm your age. This video may be inappropriate"
            ),
            ExtractorError::AgeRestricted {
                video_id: "abc".to_string()
            }
        );
        assert_eq!(
            classify_failure("abc", "ERROR: [youtube] abc: Video unavailable"),
            ExtractorError::Unavailable {
                video_id: "abc".to_string()
            }
        );
        assert_eq!(
            classify_failure("abc", "WARNING: retrying\nERROR: [youtube] abc: HTTP Error 429\n"),
            ExtractorError::Failed {
                reason: "[youtube] abc: HTTP Error 429".to_string()
            }
        );
        assert_eq!(
            classify_failure("abc", ""),
            ExtractorError::Failed {
                reason: "yt-dlp exited without an error message".to_string()
            }
        );
    }

    #[test]
    fn test_build_args_terminates_options() {
        let extractor = YtDlpExtractor::new(ExtractorConfig::default()).unwrap();
        let args = extractor.build_args("--exec-bad");

        let separator = args.iter().position(|arg| arg == "--").unwrap();
        assert_eq!(
            args[separator + 1],
            "https://www.youtube.com/watch?v=--exec-bad"
        );
        assert!(args.contains(&"--dump-single-json".to_string()));
    }

    #[tokio::test]
    async fn test_missing_binary_is_tool_unavailable() {
        let config = ExtractorConfig {
            ytdlp_path: "/nonexistent/tubegate-yt-dlp".to_string(),
            ..Default::default()
        };
        let extractor = YtDlpExtractor::new(config).unwrap();

        let error = extractor.fetch_video("dQw4w9WgXcQ").await.unwrap_err();
        assert!(matches!(error, ExtractorError::ToolUnavailable { .. }));
    }
}
