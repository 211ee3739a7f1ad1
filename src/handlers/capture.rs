use std::sync::Arc;
use std::time::Duration;

use axum::http::header;
use axum::response::{IntoResponse, Response};

use super::data::{capture_seconds, Service, CONTENT_TYPE_OCTET};
use super::error::DiagError;
use crate::runtime::sink::body_channel;
use crate::runtime::{CaptureSession, Capturer};
use crate::utils::perf::PerfLogger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureKind {
    Cpu,
    Trace,
}

impl CaptureKind {
    pub fn describe(&self) -> &'static str {
        match self {
            CaptureKind::Cpu => "CPU profiling",
            CaptureKind::Trace => "tracing",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CaptureKind::Cpu => "cpu",
            CaptureKind::Trace => "trace",
        }
    }

    fn capturer(&self, srv: &Service) -> Arc<dyn Capturer> {
        match self {
            CaptureKind::Cpu => srv.runtime.cpu.clone(),
            CaptureKind::Trace => srv.runtime.trace.clone(),
        }
    }
}

/// Opens an exclusive capture session streaming into the response body.
///
/// Headers are sent as soon as the session is open. The body completes
/// once `seconds` have elapsed and the session has been stopped, so the
/// client sees the request as taking the whole capture duration. A
/// session that fails to start leaves any running one untouched.
pub async fn handler(srv: &Service, kind: CaptureKind, query: Option<&str>) -> Response {
    let seconds = capture_seconds(query);
    let (sink, body) = body_channel();
    let session = match kind.capturer(srv).start(sink) {
        Ok(session) => session,
        Err(source) => {
            srv.metrics.observe_capture(kind.label(), "rejected");
            return DiagError::CaptureStart { kind, source }.into_response();
        }
    };
    srv.metrics.observe_capture(kind.label(), "started");
    tracing::info!(kind = kind.label(), seconds, "capture started");
    tokio::spawn(hold(kind, session, Duration::from_secs(seconds)));
    ([(header::CONTENT_TYPE, CONTENT_TYPE_OCTET)], body).into_response()
}

async fn hold(kind: CaptureKind, session: Box<dyn CaptureSession>, duration: Duration) {
    let _perf_log = PerfLogger::new(&format!("{} capture", kind.label()));
    tokio::time::sleep(duration).await;
    match tokio::task::spawn_blocking(move || session.stop()).await {
        Ok(Ok(())) => tracing::info!(kind = kind.label(), "capture stopped"),
        Ok(Err(err)) => tracing::error!(kind = kind.label(), error = %err, "capture stop failed"),
        Err(err) => tracing::error!(kind = kind.label(), error = %err, "capture stop panicked"),
    }
}
