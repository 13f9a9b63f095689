//! Request handling tests.
//!
//! Run each request procedure (expiry, clear-cache, cache hit, original,
//! render) against a throwaway store, with a counting fake renderer where
//! the number of renders matters.

use keeper_common::{parse_request, Answer, Request, Response};
use photo_keeper::{spawn_workers, Stats, Worker};
use renderer::{ImageRenderer, RenderError, RenderResult, RenderTransform};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use storage::{DiskCache, StoreLayout, WorkQueue};
use test_utils::StoreFixture;
use tokio::sync::mpsc;

// ============================================================================
// Helpers
// ============================================================================

/// Copies the source to the destination and counts calls.
#[derive(Default)]
struct CountingRenderer {
    calls: AtomicUsize,
}

impl RenderTransform for CountingRenderer {
    fn render(&self, source: &Path, dest: &Path, _edge: u32, _instructions: &str) -> RenderResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        fs::copy(source, dest)?;
        Ok(())
    }
}

/// Always fails, writing nothing.
struct FailingRenderer;

impl RenderTransform for FailingRenderer {
    fn render(&self, _: &Path, _: &Path, _: u32, _: &str) -> RenderResult<()> {
        Err(RenderError::UnknownCommand("BOOM".to_string()))
    }
}

/// Panics mid-render.
struct PanickingRenderer;

impl RenderTransform for PanickingRenderer {
    fn render(&self, _: &Path, _: &Path, _: u32, _: &str) -> RenderResult<()> {
        panic!("renderer blew up");
    }
}

fn layout(store: &StoreFixture) -> StoreLayout {
    StoreLayout::new(store.original_root(), store.cache_root())
}

fn worker_with(
    store: &StoreFixture,
    renderer: Arc<dyn RenderTransform>,
    expiry: Duration,
) -> (Worker, Arc<Stats>) {
    let cache = DiskCache::new(layout(store));
    cache.prepare().unwrap();
    let stats = Arc::new(Stats::new());
    let worker = Worker::new(cache, renderer, Arc::clone(&stats), expiry);
    (worker, stats)
}

fn request(serial: u64, image_id: u64, size: i64, instructions: &str) -> Request {
    let text = format!("127.0.0.1:9,{},{},{},{}", serial, image_id, size, instructions);
    Request::new("127.0.0.1:9".parse().unwrap(), parse_request(&text).unwrap())
}

fn reply(answer: &Answer) -> String {
    answer.reply_text()
}

// ============================================================================
// Render path
// ============================================================================

#[test]
fn test_cold_render_then_cache_hit() {
    let store = StoreFixture::new();
    store.install_original(42, 800, 600);
    let renderer = Arc::new(CountingRenderer::default());
    let (worker, stats) = worker_with(&store, renderer.clone(), Duration::from_secs(60));

    let first = worker.handle(request(1, 42, 400, ""));
    let path = first.response.file_path().cloned().expect("file response");
    assert!(path.starts_with(store.cache_root().join("42")));
    assert!(path.is_file());
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);

    let second = worker.handle(request(2, 42, 400, ""));
    assert_eq!(second.response, Response::File(path.clone()));
    assert_eq!(reply(&second), format!("2,file://{}", path.display()));
    // The hit did not invoke the transform.
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);

    let snapshot = stats.snapshot(0);
    assert_eq!(snapshot.requests, 2);
    assert_eq!(snapshot.cache_hits, 1);
    assert_eq!(snapshot.cache_hit_rate, 0.5);
}

#[test]
fn test_instructions_select_distinct_entries() {
    let store = StoreFixture::new();
    store.install_original(42, 200, 100);
    let renderer = Arc::new(CountingRenderer::default());
    let (worker, _) = worker_with(&store, renderer.clone(), Duration::from_secs(60));

    let plain = worker.handle(request(1, 42, 100, ""));
    let rotated = worker.handle(request(2, 42, 100, "ROTATE 90"));

    assert_ne!(plain.response, rotated.response);
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 2);
    assert_eq!(store.cache_files().len(), 2);
}

#[test]
fn test_real_renderer_writes_resized_jpeg() {
    let store = StoreFixture::new();
    store.install_original(42, 800, 600);
    let (worker, _) = worker_with(&store, Arc::new(ImageRenderer::new()), Duration::from_secs(60));

    let answer = worker.handle(request(7, 42, 400, ""));
    let path = answer.response.file_path().cloned().expect("file response");
    let img = image::open(&path).unwrap();
    assert_eq!((img.width(), img.height()), (400, 300));
}

#[test]
fn test_size_zero_serves_original() {
    let store = StoreFixture::new();
    let original = store.install_original(42, 100, 100);
    let renderer = Arc::new(CountingRenderer::default());
    let (worker, _) = worker_with(&store, renderer.clone(), Duration::from_secs(60));

    let answer = worker.handle(request(3, 42, 0, ""));

    assert_eq!(answer.response, Response::File(original));
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    assert!(store.cache_files().is_empty());
}

#[test]
fn test_missing_original() {
    let store = StoreFixture::new();
    let renderer = Arc::new(CountingRenderer::default());
    let (worker, stats) = worker_with(&store, renderer.clone(), Duration::from_secs(60));

    let answer = worker.handle(request(4, 7, 350, ""));

    let expected = store.original_path(7);
    assert_eq!(answer.response, Response::MissingOriginal(expected.clone()));
    assert_eq!(
        reply(&answer),
        format!("4,missing original image: {}", expected.display())
    );
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    assert_eq!(stats.snapshot(0).missing_files, 1);
}

#[test]
fn test_render_failure_replies_failed() {
    let store = StoreFixture::new();
    store.install_original(42, 100, 100);
    let (worker, stats) = worker_with(&store, Arc::new(FailingRenderer), Duration::from_secs(60));

    let answer = worker.handle(request(5, 42, 50, "BOOM 1"));

    assert_eq!(answer.response, Response::RenderFailed);
    assert_eq!(reply(&answer), "5,failed");
    assert!(store.cache_files().is_empty());
    assert_eq!(stats.snapshot(0).render_failures, 1);
}

#[test]
fn test_oversized_edge_replies_failed() {
    let store = StoreFixture::new();
    store.install_original(42, 80, 60);
    let (worker, stats) = worker_with(&store, Arc::new(ImageRenderer::new()), Duration::from_secs(60));

    let answer = worker.handle(request(8, 42, 4_000_000_000, ""));

    assert_eq!(answer.response, Response::RenderFailed);
    assert_eq!(reply(&answer), "8,failed");
    assert!(store.cache_files().is_empty());
    assert_eq!(stats.snapshot(0).render_failures, 1);
}

#[test]
fn test_panicking_renderer_still_answers() {
    let store = StoreFixture::new();
    store.install_original(42, 100, 100);
    let (worker, stats) = worker_with(&store, Arc::new(PanickingRenderer), Duration::from_secs(60));

    let answer = worker.handle(request(9, 42, 50, ""));

    assert_eq!(answer.response, Response::RenderFailed);
    assert_eq!(reply(&answer), "9,failed");
    assert_eq!(stats.snapshot(0).render_failures, 1);
}

#[tokio::test]
async fn test_pool_keeps_answering_after_a_panic() {
    let store = StoreFixture::new();
    store.install_original(42, 100, 100);
    let (worker, _) = worker_with(&store, Arc::new(PanickingRenderer), Duration::from_secs(60));

    let queue = WorkQueue::new();
    let (answer_tx, mut answer_rx) = mpsc::unbounded_channel();
    spawn_workers(1, Arc::new(worker), queue.clone(), answer_tx);

    queue.push(request(1, 42, 50, ""));
    queue.push(request(2, 42, 0, ""));

    let first = tokio::time::timeout(Duration::from_secs(10), answer_rx.recv())
        .await
        .unwrap()
        .unwrap();
    let second = tokio::time::timeout(Duration::from_secs(10), answer_rx.recv())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(reply(&first), "1,failed");
    assert_eq!(second.response, Response::File(store.original_path(42)));
}

// ============================================================================
// Expiry
// ============================================================================

#[test]
fn test_expired_request_does_no_work() {
    let store = StoreFixture::new();
    store.install_original(42, 100, 100);
    let renderer = Arc::new(CountingRenderer::default());
    let (worker, stats) = worker_with(&store, renderer.clone(), Duration::from_millis(10));

    let stale = request(6, 42, 50, "");
    std::thread::sleep(Duration::from_millis(50));
    let answer = worker.handle(stale);

    assert_eq!(answer.response, Response::Expired);
    assert_eq!(reply(&answer), "6,expired");
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);

    let snapshot = stats.snapshot(0);
    assert_eq!(snapshot.requests_expired, 1);
    assert_eq!(snapshot.requests, 0);
}

// ============================================================================
// Clear cache
// ============================================================================

#[test]
fn test_clear_cache_removes_only_that_image() {
    let store = StoreFixture::new();
    store.install_original(42, 100, 100);
    store.install_original(142, 100, 100);
    let renderer = Arc::new(CountingRenderer::default());
    let (worker, _) = worker_with(&store, renderer.clone(), Duration::from_secs(60));

    worker.handle(request(1, 42, 50, ""));
    worker.handle(request(2, 42, 60, "ROTATE h"));
    let other = worker.handle(request(3, 142, 50, ""));
    assert_eq!(store.cache_files().len(), 3);

    let answer = worker.handle(request(4, 42, -1, ""));
    assert_eq!(answer.response, Response::Cleared);
    assert_eq!(reply(&answer), "4,ok");

    let remaining = store.cache_files();
    assert_eq!(remaining.len(), 1);
    assert_eq!(Some(&remaining[0]), other.response.file_path());

    // Subsequent render request is a miss again.
    worker.handle(request(5, 42, 50, ""));
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 4);
}

#[test]
fn test_clear_cache_with_nothing_cached() {
    let store = StoreFixture::new();
    let (worker, _) = worker_with(&store, Arc::new(CountingRenderer::default()), Duration::from_secs(60));

    let answer = worker.handle(request(1, 42, -1, ""));
    assert_eq!(answer.response, Response::Cleared);
}

#[test]
fn test_clear_cache_reports_failures() {
    let store = StoreFixture::new();
    let (worker, _) = worker_with(&store, Arc::new(CountingRenderer::default()), Duration::from_secs(60));

    // A directory with a matching name cannot be removed as a file.
    let blocker = store.cache_root().join("42").join("42.400.abcdef.jpg");
    fs::create_dir_all(&blocker).unwrap();

    let answer = worker.handle(request(1, 42, -1, ""));
    match &answer.response {
        Response::ClearFailed(message) => assert!(message.contains("42.400.abcdef.jpg")),
        other => panic!("expected ClearFailed, got {:?}", other),
    }
    assert!(reply(&answer).starts_with("1,"));
    assert_ne!(reply(&answer), "1,ok");
}
