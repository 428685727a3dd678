//! Download streamer: turns a stream handle into a chunked byte source.
//!
//! Bytes are pulled from the extractor only as the consumer asks for them
//! and regrouped into fixed-size chunks, so at most one chunk plus one
//! upstream read is buffered per download. The upstream source is owned by
//! the returned `StreamSource`; dropping it at any point releases the source.

use std::sync::LazyLock;

use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::{StreamExt, stream};
use regex::Regex;
use tracing::{debug, error, info};

use super::metadata::downloadable_streams;
use super::{fetch_checked_video, map_extractor_error};
use crate::config::PipelineConfig;
use crate::extractor::{ByteStream, VideoExtractor};
use crate::{PipelineError, Result};

/// Content type of every download response.
pub const DOWNLOAD_CONTENT_TYPE: &str = "video/mp4";

/// Characters other than word characters, hyphen, underscore, period and space.
static DISALLOWED_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\-. ]").expect("filename pattern is valid"));

static WHITESPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Live byte source for one rendition of one video.
pub struct StreamSource {
    video_id: String,
    itag: String,
    filename: String,
    total_size: Option<u64>,
    chunks: BoxStream<'static, std::io::Result<Bytes>>,
}

impl StreamSource {
    /// Filename offered to the client.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Total size in bytes as reported by the opened byte source.
    ///
    /// Descriptor filesizes are estimates and never stand in for this.
    pub fn total_size(&self) -> Option<u64> {
        self.total_size
    }

    /// Consumes the source, yielding fixed-size chunks.
    ///
    /// The final chunk may be shorter. Upstream failures surface as an
    /// `io::Error` item, after which the stream ends.
    pub fn into_chunks(self) -> BoxStream<'static, std::io::Result<Bytes>> {
        self.chunks
    }
}

impl std::fmt::Debug for StreamSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSource")
            .field("video_id", &self.video_id)
            .field("itag", &self.itag)
            .field("filename", &self.filename)
            .field("total_size", &self.total_size)
            .finish_non_exhaustive()
    }
}

/// Resolves a stream handle and opens its byte source.
///
/// The handle must name one of the video's progressive MP4 renditions; no
/// byte source is opened otherwise.
///
/// # Errors
/// - `PipelineError::Validation` - Unknown handle, duration over the ceiling, restricted or
///   unavailable video
/// - `PipelineError::Upstream` - Extraction machinery or media host failed
pub async fn open_stream(
    extractor: &dyn VideoExtractor,
    config: &PipelineConfig,
    video_id: &str,
    itag: &str,
) -> Result<StreamSource> {
    let video = fetch_checked_video(extractor, config, video_id).await?;

    let Some(stream) = downloadable_streams(&video)
        .into_iter()
        .find(|stream| stream.itag == itag)
    else {
        info!("Rejecting download of {}: no stream with handle {}", video_id, itag);
        return Err(PipelineError::validation("invalid resolution"));
    };

    let label = stream.resolution.as_deref().unwrap_or(itag);
    let filename = derive_filename(&video.title, label, video_id);

    let opened = extractor
        .open_stream(&video, stream)
        .await
        .map_err(|e| map_extractor_error(extractor, video_id, e))?;

    let total_size = opened.content_length;
    info!(
        "Streaming {} itag {} as '{}' ({} bytes declared)",
        video_id,
        itag,
        filename,
        total_size.map_or_else(|| "unknown".to_string(), |size| size.to_string())
    );

    let lease = SourceLease {
        video_id: video_id.to_string(),
        itag: itag.to_string(),
        delivered: 0,
        finished: false,
    };

    Ok(StreamSource {
        video_id: video_id.to_string(),
        itag: itag.to_string(),
        filename,
        total_size,
        chunks: rechunk(opened.bytes, config.chunk_size, lease),
    })
}

/// Builds a filesystem-safe download filename.
///
/// ```
/// use tubegate_core::pipeline::derive_filename;
///
/// assert_eq!(derive_filename("Foo: Bar/Baz", "720p", "abc"), "Foo Bar Baz_720p.mp4");
/// ```
pub fn derive_filename(title: &str, resolution: &str, video_id: &str) -> String {
    let separated = title.replace(['/', '\\'], " ");
    let stripped = DISALLOWED_FILENAME_CHARS.replace_all(&separated, "");
    let collapsed = WHITESPACE_RUNS.replace_all(stripped.trim(), " ");

    let stem = if collapsed.is_empty() {
        DISALLOWED_FILENAME_CHARS
            .replace_all(video_id, "")
            .into_owned()
    } else {
        collapsed.into_owned()
    };
    let resolution = DISALLOWED_FILENAME_CHARS.replace_all(resolution, "");

    format!("{stem}_{resolution}.mp4")
}

/// Tracks one open upstream source. Dropping it marks the release.
struct SourceLease {
    video_id: String,
    itag: String,
    delivered: u64,
    finished: bool,
}

impl Drop for SourceLease {
    fn drop(&mut self) {
        if self.finished {
            debug!(
                "Released source {} itag {} after {} bytes",
                self.video_id, self.itag, self.delivered
            );
        } else {
            info!(
                "Released source {} itag {} early after {} bytes",
                self.video_id, self.itag, self.delivered
            );
        }
    }
}

struct ChunkState {
    upstream: ByteStream,
    buffer: BytesMut,
    chunk_size: usize,
    lease: SourceLease,
    upstream_done: bool,
    failed: bool,
}

impl ChunkState {
    fn emit(&mut self, chunk: Bytes) -> std::io::Result<Bytes> {
        self.lease.delivered += chunk.len() as u64;
        Ok(chunk)
    }
}

/// Regroups upstream bytes into `chunk_size` pieces.
fn rechunk(
    upstream: ByteStream,
    chunk_size: usize,
    lease: SourceLease,
) -> BoxStream<'static, std::io::Result<Bytes>> {
    let chunk_size = chunk_size.max(1);
    let state = ChunkState {
        upstream,
        buffer: BytesMut::with_capacity(chunk_size),
        chunk_size,
        lease,
        upstream_done: false,
        failed: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if state.failed {
                return None;
            }

            if state.buffer.len() >= state.chunk_size {
                let chunk = state.buffer.split_to(state.chunk_size).freeze();
                let item = state.emit(chunk);
                return Some((item, state));
            }

            if state.upstream_done {
                if state.buffer.is_empty() {
                    state.lease.finished = true;
                    return None;
                }
                let chunk = state.buffer.split().freeze();
                let item = state.emit(chunk);
                return Some((item, state));
            }

            match state.upstream.next().await {
                Some(Ok(bytes)) => state.buffer.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    error!(
                        "Upstream failure while streaming {} itag {} after {} bytes: {}",
                        state.lease.video_id, state.lease.itag, state.lease.delivered, e
                    );
                    state.failed = true;
                    state.buffer.clear();
                    return Some((Err(std::io::Error::other(e.to_string())), state));
                }
                None => state.upstream_done = true,
            }
        }
    })
    .boxed()
}
