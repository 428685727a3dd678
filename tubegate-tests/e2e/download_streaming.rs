//! Streamed downloads through the router

use std::sync::Arc;

use axum::body::to_bytes;
use axum::http::{StatusCode, header};
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use serde_json::json;
use tubegate_core::extractor::scripted::{fixture_stream, fixture_video};
use tubegate_core::extractor::{DevelopmentExtractor, ScriptedExtractor};

use crate::common::{MIB, VIDEO_ID, body_json, get, router_for, sample_extractor};

#[tokio::test]
async fn test_download_streams_one_mib_chunks() {
    let extractor = Arc::new(sample_extractor().with_upstream_chunk_size(250_000));
    let router = router_for(extractor.clone());

    let response = get(router, &format!("/api/download?video_id={VIDEO_ID}&resolution=22")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=Foo Bar Baz_720p.mp4"
    );
    assert_eq!(headers[header::CONTENT_LENGTH], (3 * MIB + 17).to_string().as_str());
    assert_eq!(headers[header::ACCEPT_RANGES], "bytes");

    let chunks: Vec<Bytes> = response
        .into_body()
        .into_data_stream()
        .try_collect()
        .await
        .unwrap();
    let lengths: Vec<usize> = chunks.iter().map(Bytes::len).collect();
    assert_eq!(lengths, vec![MIB, MIB, MIB, 17]);

    let body: Vec<u8> = chunks.concat();
    assert!(body.iter().enumerate().all(|(i, byte)| *byte == (i % 256) as u8));

    assert_eq!(extractor.open_calls(), 1);
    assert_eq!(extractor.releases(), 1);
}

#[tokio::test]
async fn test_unknown_resolution_opens_nothing() {
    let extractor = Arc::new(sample_extractor());
    let router = router_for(extractor.clone());

    for itag in ["999", "137", "43"] {
        let response = get(
            router.clone(),
            &format!("/api/download?video_id={VIDEO_ID}&resolution={itag}"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, json!({ "error": "invalid resolution" }));
    }

    assert_eq!(extractor.open_calls(), 0);
    assert_eq!(extractor.releases(), 0);
}

#[tokio::test]
async fn test_abandoned_body_releases_source_once() {
    let extractor = Arc::new(sample_extractor());
    let router = router_for(extractor.clone());

    let response = get(router, &format!("/api/download?video_id={VIDEO_ID}&resolution=22")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let mut body = response.into_body().into_data_stream();
    let first = body.next().await.unwrap().unwrap();
    assert_eq!(first.len(), MIB);
    assert_eq!(extractor.releases(), 0);

    drop(body);
    assert_eq!(extractor.releases(), 1);
}

#[tokio::test]
async fn test_unread_body_releases_source_once() {
    let extractor = Arc::new(sample_extractor());
    let router = router_for(extractor.clone());

    let response = get(router, &format!("/api/download?video_id={VIDEO_ID}&resolution=18")).await;
    assert_eq!(response.status(), StatusCode::OK);
    drop(response);

    assert_eq!(extractor.open_calls(), 1);
    assert_eq!(extractor.releases(), 1);
}

#[tokio::test]
async fn test_upstream_failure_truncates_body() {
    let extractor = Arc::new(sample_extractor().with_broken_stream(VIDEO_ID, "22", MIB + 10));
    let router = router_for(extractor.clone());

    let response = get(router, &format!("/api/download?video_id={VIDEO_ID}&resolution=22")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let result = to_bytes(response.into_body(), usize::MAX).await;
    assert!(result.is_err());
    assert_eq!(extractor.releases(), 1);
}

#[tokio::test]
async fn test_unknown_size_omits_content_length() {
    let video = fixture_video(
        "noSizeVid00",
        "No Size",
        30,
        vec![fixture_stream("18", "360p", "video/mp4", true, None)],
    );
    let extractor = ScriptedExtractor::new()
        .with_video(video)
        .with_content("noSizeVid00", "18", vec![7u8; 10])
        .without_content_length();
    let router = router_for(Arc::new(extractor));

    let response = get(router, "/api/download?video_id=noSizeVid00&resolution=18").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key(header::CONTENT_LENGTH));
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=No Size_360p.mp4"
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.as_ref(), &[7u8; 10]);
}

#[tokio::test]
async fn test_filesize_estimate_never_becomes_content_length() {
    let video = fixture_video(
        "estimateVid",
        "Estimate",
        30,
        vec![fixture_stream("18", "360p", "video/mp4", true, Some(2_000))],
    );
    let extractor = ScriptedExtractor::new()
        .with_video(video)
        .with_content("estimateVid", "18", vec![9u8; 1_500])
        .without_content_length();
    let router = router_for(Arc::new(extractor));

    let response = get(router, "/api/download?video_id=estimateVid&resolution=18").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key(header::CONTENT_LENGTH));
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.len(), 1_500);
}

#[tokio::test]
async fn test_development_catalogue_download() {
    let router = router_for(Arc::new(DevelopmentExtractor::new()));

    let response = get(router, "/api/download?video_id=dQw4w9WgXcQ&resolution=18").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=Development Sample Never Gonna Stream_360p.mp4"
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.len(), 3 * MIB + 123);
}
