use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use prometheus::HistogramOpts;
use prometheus::HistogramVec;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;

const UNMATCHED_PATH: &str = "unmatched";

#[derive(Debug, Clone)]
pub struct Metrics {
    http_perf: HistogramVec,
    captures: IntCounterVec,
}

impl Metrics {
    pub fn new(registry: &Registry) -> anyhow::Result<Self> {
        let http_perf = HistogramVec::new(
            HistogramOpts::new(
                "http_response_time_seconds",
                "HTTP method response time in seconds.",
            ),
            &["path", "status"],
        )?;
        let captures = IntCounterVec::new(
            Opts::new("capture_sessions_total", "Capture session requests by outcome."),
            &["kind", "outcome"],
        )?;

        registry.register(Box::new(http_perf.clone()))?;
        registry.register(Box::new(captures.clone()))?;

        Ok(Self {
            http_perf,
            captures,
        })
    }

    pub fn observe_capture(&self, kind: &str, outcome: &str) {
        self.captures.with_label_values(&[kind, outcome]).inc();
    }

    pub fn captures(&self, kind: &str, outcome: &str) -> u64 {
        self.captures.with_label_values(&[kind, outcome]).get()
    }

    /// Records time to response headers. Streaming capture bodies continue
    /// after this point.
    ///
    /// Requests are labeled by route template, not by raw path.
    pub async fn observe(&self, request: Request, next: Next) -> Response {
        let path = request
            .extensions()
            .get::<MatchedPath>()
            .map_or(UNMATCHED_PATH, |p| p.as_str())
            .to_string();
        let start_time = Instant::now();

        let response = next.run(request).await;
        let status_code = response.status();

        self.http_perf
            .with_label_values(&[&path, status_code.as_str()])
            .observe(start_time.elapsed().as_secs_f64());
        response
    }
}
