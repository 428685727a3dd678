//! Shared fixtures for end-to-end tests

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::Request;
use axum::response::Response;
use tower::ServiceExt;
use tubegate_core::extractor::ScriptedExtractor;
use tubegate_core::extractor::scripted::{fixture_stream, fixture_video};
use tubegate_core::{PipelineConfig, VideoExtractor, VideoService};
use tubegate_web::{AppState, build_router};

pub const VIDEO_ID: &str = "dQw4w9WgXcQ";
pub const MIB: usize = 1024 * 1024;

/// Scripted extractor with one video in five renditions, two of them not downloadable.
pub fn sample_extractor() -> ScriptedExtractor {
    let video = fixture_video(
        VIDEO_ID,
        "Foo: Bar/Baz",
        212,
        vec![
            fixture_stream("18", "360p", "video/mp4", true, Some(MIB as u64 + 100)),
            fixture_stream("137", "1080p", "video/mp4", false, Some(9 * MIB as u64)),
            fixture_stream("22", "720p", "video/mp4", true, Some(3 * MIB as u64 + 17)),
            fixture_stream("43", "360p", "video/webm", true, Some(MIB as u64)),
            fixture_stream("36", "240p", "video/mp4", true, Some(4_096)),
        ],
    );
    ScriptedExtractor::new().with_video(video)
}

pub fn router_for(extractor: Arc<dyn VideoExtractor>) -> Router {
    let videos = VideoService::new(extractor, PipelineConfig::default());
    build_router(AppState::new(videos))
}

pub async fn get(router: Router, uri: &str) -> Response {
    router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
