//! Cobalt adapter tests against a local mock instance
//!
//! Exercises the rotation contract: failing instances advance the
//! shared cursor, success leaves the cursor on the instance that served
//! the request, and exhaustion reports the last failure.

use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

use mediastem_api::pool::InstancePool;
use mediastem_api::providers::{CobaltProvider, MediaPayload, MediaProvider};
use mediastem_common::types::{AcquireRequest, MediaKind};

async fn spawn_mock_instance() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let media_url = format!("http://{addr}/media/test");

    let app = Router::new()
        .route(
            "/",
            post({
                let media_url = media_url.clone();
                move || async move {
                    Json(json!({
                        "status": "redirect",
                        "url": media_url,
                        "filename": "Test Song.mp3",
                    }))
                }
            }),
        )
        .route("/media/test", get(|| async { "mock-media-bytes" }));

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn request() -> AcquireRequest {
    AcquireRequest {
        url: "https://example.com/watch?v=abc".to_string(),
        kind: MediaKind::Audio,
        options: HashMap::new(),
    }
}

#[tokio::test]
async fn rotates_past_failing_instances_to_success() {
    let live = spawn_mock_instance().await;

    // Ports 1 and 2 refuse connections immediately
    let pool = Arc::new(
        InstancePool::new(vec![
            "http://127.0.0.1:1".to_string(),
            "http://127.0.0.1:2".to_string(),
            live.clone(),
        ])
        .unwrap(),
    );
    let provider =
        CobaltProvider::new(Arc::clone(&pool), "320".to_string(), "1080".to_string()).unwrap();

    let acquired = provider.acquire(&request()).await.unwrap();

    assert_eq!(acquired.title, "Test Song");
    match acquired.payload {
        MediaPayload::Bytes(bytes) => assert_eq!(&bytes[..], b"mock-media-bytes"),
        MediaPayload::File(_) => panic!("expected in-memory payload"),
    }

    // Two failures advanced the shared cursor onto the live instance,
    // where it stays after success.
    assert_eq!(pool.current(), live);
}

#[tokio::test]
async fn exhausts_after_one_attempt_per_instance() {
    let pool = Arc::new(
        InstancePool::new(vec![
            "http://127.0.0.1:1".to_string(),
            "http://127.0.0.1:2".to_string(),
        ])
        .unwrap(),
    );
    let provider =
        CobaltProvider::new(Arc::clone(&pool), "320".to_string(), "1080".to_string()).unwrap();

    let err = provider.acquire(&request()).await.unwrap_err();
    assert_eq!(err.provider, "cobalt");
    assert!(err.message.contains("all 2 instances failed"));

    // Both failures advanced the cursor; it wrapped back to the start
    assert_eq!(pool.current(), "http://127.0.0.1:1");
}

#[tokio::test]
async fn error_status_body_rotates_the_pool() {
    // An instance that answers 200 but reports a job error
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route(
        "/",
        post(|| async {
            Json(json!({
                "status": "error",
                "error": {"code": "service.unavailable"},
            }))
        }),
    );
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let pool = Arc::new(InstancePool::new(vec![format!("http://{addr}")]).unwrap());
    let provider =
        CobaltProvider::new(Arc::clone(&pool), "320".to_string(), "1080".to_string()).unwrap();

    let err = provider.acquire(&request()).await.unwrap_err();
    assert!(err.message.contains("service.unavailable"));
}
