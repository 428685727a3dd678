//! Axum server for the Tubegate API
//!
//! Wires the pipeline into JSON and streaming endpoints. Handlers share one
//! `VideoService`; no request state outlives its response.

use axum::Router;
use axum::routing::get;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tubegate_core::{TubegateConfig, VideoService};

use crate::errors::handle_panic;
use crate::handlers::{api_download, api_video_info, health_check, index_page, not_found};

/// Application state shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Metadata and download pipeline
    pub videos: VideoService,
}

impl AppState {
    /// Creates state around a video service.
    pub fn new(videos: VideoService) -> Self {
        Self { videos }
    }
}

/// Builds the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/health", get(health_check))
        // JSON API endpoints
        .route("/api/video-info", get(api_video_info))
        .route("/api/download", get(api_download))
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Runs the HTTP server until Ctrl-C.
///
/// # Errors
/// - `Box<dyn std::error::Error>` - Extractor initialization or listener binding failed
pub async fn run_server(config: TubegateConfig) -> Result<(), Box<dyn std::error::Error>> {
    let videos = VideoService::from_runtime_mode(config.runtime_mode, &config)?;
    info!(
        "Starting Tubegate in {} mode with {} extractor",
        config.runtime_mode,
        videos.extractor_name()
    );

    let app = build_router(AppState::new(videos));

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Tubegate API server running on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Tubegate API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;
    use tubegate_core::PipelineConfig;
    use tubegate_core::extractor::ScriptedExtractor;
    use tubegate_core::extractor::scripted::{fixture_stream, fixture_video};

    use super::*;

    fn test_router(extractor: Arc<ScriptedExtractor>) -> Router {
        let videos = VideoService::new(extractor, PipelineConfig::default());
        build_router(AppState::new(videos))
    }

    fn sample_extractor() -> Arc<ScriptedExtractor> {
        let video = fixture_video(
            "dQw4w9WgXcQ",
            "Foo: Bar/Baz",
            212,
            vec![
                fixture_stream("18", "360p", "video/mp4", true, Some(2_000)),
                fixture_stream("22", "720p", "video/mp4", true, Some(5_000)),
            ],
        );
        Arc::new(ScriptedExtractor::new().with_video(video))
    }

    async fn get(router: Router, uri: &str) -> axum::response::Response {
        router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_video_info_route() {
        let response = get(
            test_router(sample_extractor()),
            "/api/video-info?video_id=dQw4w9WgXcQ",
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["title"], "Foo: Bar/Baz");
        assert_eq!(json["streams"][0]["itag"], "22");
        assert_eq!(json["streams"][0]["type"], "MP4");
    }

    #[tokio::test]
    async fn test_download_route_headers() {
        let extractor = sample_extractor();
        let response = get(
            test_router(Arc::clone(&extractor)),
            "/api/download?video_id=dQw4w9WgXcQ&resolution=18",
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "video/mp4");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=Foo Bar Baz_360p.mp4"
        );
        assert_eq!(headers[header::CONTENT_LENGTH], "2000");
        assert_eq!(headers[header::ACCEPT_RANGES], "bytes");

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.len(), 2_000);
        assert_eq!(extractor.releases(), 1);
    }

    #[tokio::test]
    async fn test_missing_parameters() {
        let response = get(test_router(sample_extractor()), "/api/video-info").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error": "missing video ID parameter" })
        );

        let response = get(
            test_router(sample_extractor()),
            "/api/download?video_id=dQw4w9WgXcQ",
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error": "missing required parameters" })
        );
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let response = get(test_router(sample_extractor()), "/api/nope").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error": "API endpoint not found" })
        );
    }

    #[tokio::test]
    async fn test_health_and_cors() {
        let response = get(test_router(sample_extractor()), "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");

        let response = test_router(sample_extractor())
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ORIGIN, "https://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(
            response
                .headers()
                .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        );
    }
}
