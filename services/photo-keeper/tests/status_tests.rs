//! Status endpoint tests, driven through the router without a socket.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use photo_keeper::status::{router, StatusState};
use photo_keeper::{LogBuffer, Stats};
use std::sync::Arc;
use std::time::Duration;
use storage::WorkQueue;
use tower::ServiceExt;

fn state() -> StatusState {
    StatusState {
        stats: Arc::new(Stats::new()),
        queue: WorkQueue::new(),
        log: LogBuffer::new(100),
        prometheus: None,
    }
}

async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_stats_dump() {
    let state = state();
    state.stats.record_handled("ROTATE 90", Duration::from_millis(20));
    state.stats.record_cache_hit();
    state.stats.record_reply(Duration::from_millis(40));

    let (status, body) = get(router(state), "/").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("requests 1\n"));
    assert!(body.contains("cache_hits 1\n"));
    assert!(body.contains("cache_hit_rate 1.0000\n"));
    assert!(body.contains("render_instructions ROTATE 90\n"));
    assert!(body.contains("version 1.2\n"));

    let keys: Vec<&str> = body
        .lines()
        .map(|line| line.split(' ').next().unwrap())
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[tokio::test]
async fn test_stats_report_queue_depth() {
    let state = state();
    let parsed = keeper_common::parse_request("x,1,42,0,").unwrap();
    state
        .queue
        .push(keeper_common::Request::new("127.0.0.1:1".parse().unwrap(), parsed));

    let (_, body) = get(router(state), "/").await;
    assert!(body.contains("queue_depth 1\n"));
}

#[tokio::test]
async fn test_log_page() {
    let state = state();
    state.log.push("first line".to_string());
    state.log.push("second line".to_string());

    let (status, body) = get(router(state), "/log").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "first line\nsecond line\n");
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get(router(state()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn test_metrics_without_recorder() {
    let (status, _) = get(router(state()), "/metrics").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let (status, _) = get(router(state()), "/favicon.ico").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(router(state()), "/log/extra").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
