//! YouTube URL and video ID validation.
//!
//! Validation never fails loudly: anything that cannot be parsed is simply
//! not a valid YouTube URL.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::PipelineError;
use crate::config::{DEFAULT_ALLOWED_DOMAINS, PipelineConfig};

/// `v=` or `/` followed by exactly 11 ID characters.
static VIDEO_ID_IN_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:v=|/)([0-9A-Za-z_-]{11})(?:[^0-9A-Za-z_-]|$)")
        .expect("video ID pattern is valid")
});

/// Checks a URL against the default allow-list and video ID shape.
///
/// ```
/// use tubegate_core::validation::validate;
///
/// assert!(validate("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
/// assert!(!validate("https://vimeo.com/12345"));
/// ```
pub fn validate(url: &str) -> bool {
    extract_video_id(url).is_some()
}

/// Extracts the video ID from a URL on the default allow-list.
pub fn extract_video_id(url: &str) -> Option<String> {
    extract_video_id_with(url, DEFAULT_ALLOWED_DOMAINS)
}

/// Checks a URL against a caller-supplied domain allow-list.
pub fn validate_with<S: AsRef<str>>(url: &str, allowed_domains: &[S]) -> bool {
    extract_video_id_with(url, allowed_domains).is_some()
}

/// Extracts the video ID from a URL whose domain is allow-listed.
pub fn extract_video_id_with<S: AsRef<str>>(url: &str, allowed_domains: &[S]) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }

    let host = parsed.host_str()?.to_ascii_lowercase();
    if !is_allowed_domain(&host, allowed_domains) {
        return None;
    }

    let mut locator = parsed.path().to_string();
    if let Some(query) = parsed.query() {
        locator.push('?');
        locator.push_str(query);
    }

    VIDEO_ID_IN_URL
        .captures(&locator)
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str().to_string())
}

/// Turns a caller-supplied `video_id` parameter into a video ID.
///
/// Values that look like URLs must pass validation and yield their embedded
/// ID. Anything else is trusted as an ID and handed to the extractor, which
/// reports unknown IDs as unavailable.
///
/// # Errors
///
/// - `PipelineError::Validation` - Empty input or a URL that fails validation
pub fn resolve_video_id(raw: &str, config: &PipelineConfig) -> Result<String, PipelineError> {
    let candidate = raw.trim();
    if candidate.is_empty() {
        return Err(PipelineError::validation("missing video ID parameter"));
    }

    if candidate.contains("://") {
        return extract_video_id_with(candidate, &config.allowed_domains)
            .ok_or_else(|| PipelineError::validation("invalid YouTube URL"));
    }

    Ok(candidate.to_string())
}

fn is_allowed_domain<S: AsRef<str>>(host: &str, allowed_domains: &[S]) -> bool {
    let domain = host.strip_prefix("www.").unwrap_or(host);
    allowed_domains.iter().any(|allowed| {
        let allowed = allowed.as_ref();
        domain == allowed
            || domain
                .strip_suffix(allowed)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}
