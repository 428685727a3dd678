//! Scripted extractor for tests.
//!
//! Serves fixture videos with fixed byte content, injects failures, and
//! counts how many byte sources were opened and released.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream};

use super::{ExtractedStream, ExtractedVideo, ExtractorError, OpenedStream, VideoExtractor};

/// Increments the shared counter when the owning byte stream is dropped.
struct ReleaseProbe(Arc<AtomicUsize>);

impl Drop for ReleaseProbe {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Extractor returning pre-registered fixtures.
#[derive(Debug, Default)]
pub struct ScriptedExtractor {
    videos: HashMap<String, ExtractedVideo>,
    contents: HashMap<(String, String), Bytes>,
    failures: HashMap<String, ExtractorError>,
    broken_streams: HashMap<(String, String), usize>,
    upstream_chunk_size: Option<usize>,
    hide_content_length: bool,
    open_calls: AtomicUsize,
    releases: Arc<AtomicUsize>,
}

impl ScriptedExtractor {
    /// Creates an empty scripted extractor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a video; stream contents default to a byte pattern of the declared filesize.
    pub fn with_video(mut self, video: ExtractedVideo) -> Self {
        for stream in &video.streams {
            let size = stream.filesize.unwrap_or(0) as usize;
            let content: Vec<u8> = (0..size).map(|i| (i % 256) as u8).collect();
            self.contents.insert(
                (video.video_id.clone(), stream.itag.clone()),
                Bytes::from(content),
            );
        }
        self.videos.insert(video.video_id.clone(), video);
        self
    }

    /// Overrides the byte content of one stream.
    pub fn with_content(mut self, video_id: &str, itag: &str, content: impl Into<Bytes>) -> Self {
        self.contents
            .insert((video_id.to_string(), itag.to_string()), content.into());
        self
    }

    /// Makes `fetch_video` fail for the given ID.
    pub fn with_failure(mut self, video_id: &str, error: ExtractorError) -> Self {
        self.failures.insert(video_id.to_string(), error);
        self
    }

    /// Makes a stream fail with a transport error after `after_bytes` bytes.
    pub fn with_broken_stream(mut self, video_id: &str, itag: &str, after_bytes: usize) -> Self {
        self.broken_streams
            .insert((video_id.to_string(), itag.to_string()), after_bytes);
        self
    }

    /// Sets the size of chunks the fake upstream yields (defaults to 100 KiB).
    pub fn with_upstream_chunk_size(mut self, size: usize) -> Self {
        self.upstream_chunk_size = Some(size.max(1));
        self
    }

    /// Reports streams without a content length, like a chunked upstream response.
    pub fn without_content_length(mut self) -> Self {
        self.hide_content_length = true;
        self
    }

    /// Number of `open_stream` calls made so far.
    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    /// Number of opened byte streams that have been released.
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoExtractor for ScriptedExtractor {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn fetch_video(&self, video_id: &str) -> Result<ExtractedVideo, ExtractorError> {
        if let Some(error) = self.failures.get(video_id) {
            return Err(error.clone());
        }
        self.videos
            .get(video_id)
            .cloned()
            .ok_or_else(|| ExtractorError::Unavailable {
                video_id: video_id.to_string(),
            })
    }

    async fn open_stream(
        &self,
        video: &ExtractedVideo,
        stream: &ExtractedStream,
    ) -> Result<OpenedStream, ExtractorError> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);

        let key = (video.video_id.clone(), stream.itag.clone());
        let content = self.contents.get(&key).cloned().unwrap_or_default();
        let content_length = (!self.hide_content_length).then_some(content.len() as u64);
        let fail_at = self.broken_streams.get(&key).copied();
        let chunk_size = self.upstream_chunk_size.unwrap_or(100 * 1024);
        let probe = ReleaseProbe(Arc::clone(&self.releases));

        let bytes = stream::unfold(
            (probe, content, 0usize, false),
            move |(probe, content, offset, failed)| async move {
                if failed {
                    return None;
                }
                if fail_at.is_some_and(|limit| offset >= limit) {
                    let error = ExtractorError::Transport {
                        reason: "connection reset by media host".to_string(),
                    };
                    return Some((Err(error), (probe, content, offset, true)));
                }
                if offset >= content.len() {
                    return None;
                }
                let mut end = std::cmp::min(offset + chunk_size, content.len());
                if let Some(limit) = fail_at {
                    end = std::cmp::min(end, limit);
                }
                let chunk = content.slice(offset..end);
                Some((Ok(chunk), (probe, content, end, false)))
            },
        )
        .boxed();

        Ok(OpenedStream {
            bytes,
            content_length,
        })
    }
}

/// Builds a fixture video.
pub fn fixture_video(
    video_id: &str,
    title: &str,
    duration_secs: u64,
    streams: Vec<ExtractedStream>,
) -> ExtractedVideo {
    ExtractedVideo {
        video_id: video_id.to_string(),
        title: title.to_string(),
        author: "Fixture Author".to_string(),
        duration_secs,
        thumbnail_url: format!("https://i.ytimg.com/vi/{video_id}/hqdefault.jpg"),
        streams,
    }
}

/// Builds a fixture stream; `progressive` controls whether audio is present.
pub fn fixture_stream(
    itag: &str,
    resolution: &str,
    mime_type: &str,
    progressive: bool,
    filesize: Option<u64>,
) -> ExtractedStream {
    ExtractedStream {
        itag: itag.to_string(),
        resolution: (!resolution.is_empty()).then(|| resolution.to_string()),
        filesize,
        fps: Some(30),
        mime_type: mime_type.to_string(),
        has_video: true,
        has_audio: progressive,
        locator: None,
        request_headers: Vec::new(),
    }
}
