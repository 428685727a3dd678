//! JSON endpoints, routing and error mapping

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;
use tubegate_core::ExtractorError;
use tubegate_core::extractor::DevelopmentExtractor;
use tubegate_core::extractor::development::{AGE_RESTRICTED_VIDEO_ID, DELETED_VIDEO_ID};

use crate::common::{VIDEO_ID, body_json, get, router_for, sample_extractor};

#[tokio::test]
async fn test_video_info_lists_progressive_mp4_highest_first() {
    let router = router_for(Arc::new(sample_extractor()));

    let response = get(router, &format!("/api/video-info?video_id={VIDEO_ID}")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["title"], "Foo: Bar/Baz");
    assert_eq!(json["author"], "Fixture Author");
    assert_eq!(json["duration"], 212);
    assert_eq!(
        json["thumbnail_url"],
        format!("https://i.ytimg.com/vi/{VIDEO_ID}/hqdefault.jpg")
    );

    let itags: Vec<&str> = json["streams"]
        .as_array()
        .unwrap()
        .iter()
        .map(|stream| stream["itag"].as_str().unwrap())
        .collect();
    assert_eq!(itags, vec!["22", "18", "36"]);
    assert_eq!(
        json["streams"][0],
        json!({
            "itag": "22",
            "resolution": "720p",
            "filesize": 3 * 1024 * 1024 + 17,
            "fps": 30,
            "type": "MP4"
        })
    );
}

#[tokio::test]
async fn test_video_info_accepts_youtube_urls() {
    let router = router_for(Arc::new(sample_extractor()));

    let response = get(
        router,
        "/api/video-info?video_id=https%3A%2F%2Fwww.youtube.com%2Fwatch%3Fv%3DdQw4w9WgXcQ",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["title"], "Foo: Bar/Baz");
}

#[tokio::test]
async fn test_video_info_rejects_foreign_urls() {
    let router = router_for(Arc::new(sample_extractor()));

    let response = get(router, "/api/video-info?video_id=https%3A%2F%2Fvimeo.com%2F12345").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await, json!({ "error": "invalid YouTube URL" }));
}

#[tokio::test]
async fn test_missing_video_id() {
    for uri in ["/api/video-info", "/api/video-info?video_id="] {
        let response = get(router_for(Arc::new(sample_extractor())), uri).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "missing video ID parameter" })
        );
    }
}

#[tokio::test]
async fn test_missing_download_parameters() {
    for uri in [
        "/api/download",
        "/api/download?video_id=dQw4w9WgXcQ",
        "/api/download?resolution=22",
        "/api/download?video_id=&resolution=22",
    ] {
        let response = get(router_for(Arc::new(sample_extractor())), uri).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(
            body_json(response).await,
            json!({ "error": "missing required parameters" })
        );
    }
}

#[tokio::test]
async fn test_restricted_and_missing_videos() {
    let router = router_for(Arc::new(DevelopmentExtractor::new()));

    let response = get(
        router.clone(),
        &format!("/api/video-info?video_id={AGE_RESTRICTED_VIDEO_ID}"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "age-restricted, cannot download" })
    );

    let response = get(router, &format!("/api/video-info?video_id={DELETED_VIDEO_ID}")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "video unavailable or deleted" })
    );
}

#[tokio::test]
async fn test_long_video_rejected() {
    let router = router_for(Arc::new(DevelopmentExtractor::new()));

    let response = get(router, "/api/video-info?video_id=LongLecture").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json.get("streams").is_none());
    assert!(
        json["error"]
            .as_str()
            .unwrap()
            .starts_with("duration exceeds limit")
    );
}

#[tokio::test]
async fn test_backend_failures() {
    let extractor = sample_extractor()
        .with_failure(
            "rateLimited",
            ExtractorError::Failed {
                reason: "HTTP Error 429: Too Many Requests".to_string(),
            },
        )
        .with_failure(
            "garbledJson",
            ExtractorError::Malformed {
                reason: "expected value at line 1 column 1".to_string(),
            },
        );
    let router = router_for(Arc::new(extractor));

    let response = get(router.clone(), "/api/video-info?video_id=rateLimited").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "error processing video: HTTP Error 429: Too Many Requests" })
    );

    let response = get(router, "/api/video-info?video_id=garbledJson").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await, json!({ "error": "internal server error" }));
}

#[tokio::test]
async fn test_health_index_and_fallback() {
    let router = router_for(Arc::new(sample_extractor()));

    let response = get(router.clone(), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert!(json["timestamp"].is_string());

    let response = get(router.clone(), "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[axum::http::header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html")
    );

    let response = get(router, "/api/unknown").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await, json!({ "error": "API endpoint not found" }));
}
