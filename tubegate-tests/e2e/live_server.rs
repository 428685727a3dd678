//! Requests over a real socket

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::net::TcpListener;
use tubegate_core::VideoExtractor;
use tubegate_core::extractor::scripted::{fixture_stream, fixture_video};
use tubegate_core::extractor::{DevelopmentExtractor, ScriptedExtractor};

use crate::common::{MIB, router_for};

async fn spawn_server(extractor: Arc<dyn VideoExtractor>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let app = router_for(extractor);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{address}")
}

#[tokio::test]
async fn test_download_over_http() {
    let base = spawn_server(Arc::new(DevelopmentExtractor::new())).await;

    let response = reqwest::get(format!("{base}/api/download?video_id=dQw4w9WgXcQ&resolution=22"))
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.content_length(), Some(5 * MIB as u64 + 77));
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=Development Sample Never Gonna Stream_720p.mp4"
    );

    let body = response.bytes().await.unwrap();
    assert_eq!(body.len(), 5 * MIB + 77);
    assert_eq!(body[251], 0);
    assert_eq!(body[252], 1);
}

#[tokio::test]
async fn test_short_source_with_filesize_estimate_over_http() {
    let video = fixture_video(
        "estimateVid",
        "Estimate",
        30,
        vec![fixture_stream("18", "360p", "video/mp4", true, Some(2_000))],
    );
    let extractor = ScriptedExtractor::new()
        .with_video(video)
        .with_content("estimateVid", "18", vec![5u8; 1_500])
        .without_content_length();
    let base = spawn_server(Arc::new(extractor)).await;

    let response = reqwest::get(format!("{base}/api/download?video_id=estimateVid&resolution=18"))
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.content_length(), None);
    let body = response.bytes().await.unwrap();
    assert_eq!(body.len(), 1_500);
}

#[tokio::test]
async fn test_video_info_over_http_with_cors() {
    let base = spawn_server(Arc::new(DevelopmentExtractor::new())).await;

    let response = reqwest::Client::new()
        .get(format!("{base}/api/video-info?video_id=dQw4w9WgXcQ"))
        .header("Origin", "https://client.example")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");

    let json: serde_json::Value = response.json().await.unwrap();
    let itags: Vec<&str> = json["streams"]
        .as_array()
        .unwrap()
        .iter()
        .map(|stream| stream["itag"].as_str().unwrap())
        .collect();
    assert_eq!(itags, vec!["22", "18"]);
}

#[tokio::test]
async fn test_client_disconnect_releases_source() {
    let video = fixture_video(
        "dQw4w9WgXcQ",
        "Big",
        60,
        vec![fixture_stream("22", "720p", "video/mp4", true, Some(64 * MIB as u64))],
    );
    let extractor = Arc::new(ScriptedExtractor::new().with_video(video));
    let base = spawn_server(extractor.clone()).await;

    let response = reqwest::get(format!("{base}/api/download?video_id=dQw4w9WgXcQ&resolution=22"))
        .await
        .unwrap();
    let mut body = response.bytes_stream();
    let first = body.next().await.unwrap().unwrap();
    assert!(!first.is_empty());
    drop(body);

    let released = tokio::time::timeout(Duration::from_secs(10), async {
        while extractor.releases() == 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;

    assert!(released.is_ok(), "source was not released after disconnect");
    assert_eq!(extractor.open_calls(), 1);
    assert_eq!(extractor.releases(), 1);
}
