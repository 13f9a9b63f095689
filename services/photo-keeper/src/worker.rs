//! Request handling and the worker pool.
//!
//! A [`Worker`] resolves one request synchronously: expiry check, then
//! either clear-cache or cache lookup with render on miss. The pool runs N
//! async tasks that pull from the shared queue and run each request on the
//! blocking thread pool, since rendering is CPU and disk bound.

use keeper_common::{Answer, RenderSize, Request, Response};
use renderer::RenderTransform;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use storage::{DiskCache, WorkQueue};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::stats::Stats;

pub struct Worker {
    cache: DiskCache,
    renderer: Arc<dyn RenderTransform>,
    stats: Arc<Stats>,
    expiry: Duration,
}

impl Worker {
    pub fn new(
        cache: DiskCache,
        renderer: Arc<dyn RenderTransform>,
        stats: Arc<Stats>,
        expiry: Duration,
    ) -> Self {
        Self {
            cache,
            renderer,
            stats,
            expiry,
        }
    }

    /// Resolve a request to its answer. Every request gets exactly one,
    /// including when the handler panics.
    pub fn handle(&self, request: Request) -> Answer {
        let response = match panic::catch_unwind(AssertUnwindSafe(|| self.respond(&request))) {
            Ok(response) => response,
            Err(_) => {
                error!(request = %request, "Request handler panicked");
                self.stats.record_render_failure();
                Response::RenderFailed
            }
        };
        request.answer(response)
    }

    fn respond(&self, request: &Request) -> Response {
        let started = Instant::now();

        let age = request.age();
        if age > self.expiry {
            info!(
                request = %request,
                age_ms = age.as_millis() as u64,
                "Punting on expired request"
            );
            self.stats.record_expired();
            return Response::Expired;
        }

        let response = match request.size {
            RenderSize::ClearCache => self.clear_cache(request),
            RenderSize::Original => self.serve(request, None),
            RenderSize::Edge(edge) => self.serve(request, Some(edge)),
        };

        self.stats
            .record_handled(&request.instructions, started.elapsed());
        response
    }

    fn clear_cache(&self, request: &Request) -> Response {
        let outcome = self.cache.clear(request.image_id);
        match outcome.error_summary() {
            None => {
                info!(
                    image_id = request.image_id,
                    removed = outcome.removed.len(),
                    "Cleared cached renders"
                );
                Response::Cleared
            }
            Some(summary) => {
                warn!(
                    image_id = request.image_id,
                    removed = outcome.removed.len(),
                    failed = outcome.failures.len(),
                    "Clear-cache incomplete"
                );
                Response::ClearFailed(summary)
            }
        }
    }

    /// Cache lookup, falling back to the original (`edge` of `None`) or a
    /// fresh render.
    fn serve(&self, request: &Request, edge: Option<u32>) -> Response {
        let layout = self.cache.layout();
        let key = layout.cache_key(request.image_id, request.size, &request.instructions);

        if let Some(path) = self.cache.lookup(&key) {
            debug!(key = %key, "Cache hit");
            self.stats.record_cache_hit();
            return Response::File(path);
        }

        let original = layout.original_path(request.image_id);
        if !original.is_file() {
            warn!(path = %original.display(), "Missing original image");
            self.stats.record_missing_file();
            return Response::MissingOriginal(original);
        }

        let Some(edge) = edge else {
            return Response::File(original);
        };

        let dest = layout.cache_path(&key);
        let render_start = Instant::now();
        match self
            .renderer
            .render(&original, &dest, edge, &request.instructions)
        {
            Ok(()) => {
                debug!(
                    key = %key,
                    duration_ms = render_start.elapsed().as_millis() as u64,
                    "Rendered"
                );
                Response::File(dest)
            }
            Err(e) => {
                error!(
                    image_id = request.image_id,
                    path = %dest.display(),
                    error = %e,
                    "Render failed"
                );
                self.stats.record_render_failure();
                Response::RenderFailed
            }
        }
    }
}

/// Start `count` workers draining `queue`. Answers go to `answers`.
///
/// Workers run until the answer channel closes or the runtime shuts down.
pub fn spawn_workers(
    count: usize,
    worker: Arc<Worker>,
    queue: WorkQueue<Request>,
    answers: mpsc::UnboundedSender<Answer>,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|index| {
            let worker = Arc::clone(&worker);
            let queue = queue.clone();
            let answers = answers.clone();
            tokio::spawn(async move {
                info!(worker = index, "Worker started");
                while let Some(request) = queue.pop().await {
                    let worker = Arc::clone(&worker);
                    let answer =
                        match tokio::task::spawn_blocking(move || worker.handle(request)).await {
                            Ok(answer) => answer,
                            Err(e) => {
                                error!(worker = index, error = %e, "Request handler cancelled");
                                continue;
                            }
                        };
                    if answers.send(answer).is_err() {
                        debug!(worker = index, "Answer channel closed");
                        break;
                    }
                }
                info!(worker = index, "Worker stopped");
            })
        })
        .collect()
}
