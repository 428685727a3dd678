//! Index page, health probe and route fallback

use axum::Json;
use axum::response::Html;
use serde::Serialize;

use crate::errors::ApiError;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Tubegate</title>
    <style>
        body { font-family: sans-serif; max-width: 48rem; margin: 2rem auto; line-height: 1.5; }
        code { background: #f2f2f2; padding: 0.1rem 0.3rem; }
    </style>
</head>
<body>
    <h1>Tubegate</h1>
    <p>Metadata and progressive MP4 downloads for YouTube videos.</p>

    <h2>Endpoints</h2>
    <ul>
        <li>
            <code>GET /api/video-info?video_id=&lt;id or URL&gt;</code>
            returns title, author, duration, thumbnail and the downloadable streams,
            highest resolution first.
        </li>
        <li>
            <code>GET /api/download?video_id=&lt;id&gt;&amp;resolution=&lt;itag&gt;</code>
            streams the chosen rendition as <code>video/mp4</code>. Use an <code>itag</code>
            from the video-info response.
        </li>
        <li><code>GET /health</code> reports service status.</li>
    </ul>

    <h2>Limits</h2>
    <p>Videos longer than 60 minutes, age-restricted videos and unavailable videos are rejected.</p>
</body>
</html>
"#;

/// Health probe body.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// Always `healthy` while the server answers
    pub status: &'static str,
    /// Current time, RFC 3339 UTC
    pub timestamp: String,
}

/// Renders the static documentation page.
pub async fn index_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Reports that the server is up.
pub async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Answers unmatched routes with a JSON 404.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_timestamp_is_rfc3339() {
        let Json(health) = health_check().await;
        assert_eq!(health.status, "healthy");
        assert!(chrono::DateTime::parse_from_rfc3339(&health.timestamp).is_ok());
    }

    #[tokio::test]
    async fn test_index_documents_endpoints() {
        let Html(page) = index_page().await;
        assert!(page.contains("/api/video-info"));
        assert!(page.contains("/api/download"));
        assert!(page.contains("/health"));
    }
}
