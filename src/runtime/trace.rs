//! Execution trace recorder.
//!
//! A [`tracing_subscriber::Layer`] that stays installed for the life of the
//! process and is idle until a trace session starts. While a session is open
//! every span and event is written to the session's sink as one JSON line.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use super::{BodySink, CaptureError, CaptureSession, Capturer};

pub const NAME: &str = "tracing";

struct Active {
    sink: BodySink,
    started: Instant,
}

#[derive(Default)]
pub struct TraceRecorder {
    enabled: AtomicBool,
    records: AtomicU64,
    dropped: AtomicU64,
    active: Mutex<Option<Active>>,
}

impl TraceRecorder {
    pub fn new() -> TraceRecorder {
        TraceRecorder::default()
    }

    pub fn layer(self: &Arc<Self>) -> RecorderLayer {
        RecorderLayer {
            recorder: self.clone(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Active>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, mut value: Value) {
        if !self.is_enabled() {
            return;
        }
        let active = self.lock();
        let Some(active) = active.as_ref() else {
            return;
        };
        if let Value::Object(map) = &mut value {
            map.insert(
                "ts".into(),
                Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true).into(),
            );
            map.insert("thread".into(), thread_label().into());
        }
        let mut line = value.to_string();
        line.push('\n');
        if active.sink.write(line) {
            self.records.fetch_add(1, Ordering::Relaxed);
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Detaches the sink, returning it with the written and dropped record counts.
    fn finish(&self) -> Option<(Active, u64, u64)> {
        let mut active = self.lock();
        self.enabled.store(false, Ordering::Release);
        active.take().map(|a| {
            (
                a,
                self.records.swap(0, Ordering::Relaxed),
                self.dropped.swap(0, Ordering::Relaxed),
            )
        })
    }
}

impl Capturer for Arc<TraceRecorder> {
    fn start(&self, sink: BodySink) -> Result<Box<dyn CaptureSession>, CaptureError> {
        let mut active = self.lock();
        if active.is_some() {
            return Err(CaptureError::AlreadyRunning(NAME));
        }
        self.records.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
        *active = Some(Active {
            sink,
            started: Instant::now(),
        });
        self.enabled.store(true, Ordering::Release);
        Ok(Box::new(TraceSession {
            recorder: self.clone(),
        }))
    }
}

struct TraceSession {
    recorder: Arc<TraceRecorder>,
}

impl CaptureSession for TraceSession {
    fn stop(self: Box<Self>) -> anyhow::Result<()> {
        let (active, records, dropped) = self
            .recorder
            .finish()
            .ok_or_else(|| anyhow::anyhow!("trace session already stopped"))?;
        let end = json!({
            "kind": "end",
            "ts": Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            "records": records,
            "dropped": dropped,
            "duration_ms": active.started.elapsed().as_millis() as u64,
        });
        active.sink.write(format!("{end}\n"));
        Ok(())
    }
}

pub struct RecorderLayer {
    recorder: Arc<TraceRecorder>,
}

impl<S> Layer<S> for RecorderLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, _ctx: Context<'_, S>) {
        if !self.recorder.is_enabled() {
            return;
        }
        let mut fields = FieldVisitor::default();
        attrs.record(&mut fields);
        let meta = attrs.metadata();
        self.recorder.record(json!({
            "kind": "span_new",
            "id": id.into_u64(),
            "name": meta.name(),
            "target": meta.target(),
            "level": meta.level().as_str(),
            "fields": Value::Object(fields.0),
        }));
    }

    fn on_enter(&self, id: &Id, _ctx: Context<'_, S>) {
        if self.recorder.is_enabled() {
            self.recorder
                .record(json!({"kind": "span_enter", "id": id.into_u64()}));
        }
    }

    fn on_exit(&self, id: &Id, _ctx: Context<'_, S>) {
        if self.recorder.is_enabled() {
            self.recorder
                .record(json!({"kind": "span_exit", "id": id.into_u64()}));
        }
    }

    fn on_close(&self, id: Id, _ctx: Context<'_, S>) {
        if self.recorder.is_enabled() {
            self.recorder
                .record(json!({"kind": "span_close", "id": id.into_u64()}));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        if !self.recorder.is_enabled() {
            return;
        }
        let mut fields = FieldVisitor::default();
        event.record(&mut fields);
        let meta = event.metadata();
        let span = ctx.event_span(event).map(|s| s.id().into_u64());
        self.recorder.record(json!({
            "kind": "event",
            "level": meta.level().as_str(),
            "target": meta.target(),
            "span": span,
            "fields": Value::Object(fields.0),
        }));
    }
}

fn thread_label() -> String {
    let current = std::thread::current();
    match current.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", current.id()),
    }
}

#[derive(Default)]
struct FieldVisitor(Map<String, Value>);

impl Visit for FieldVisitor {
    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name().into(), value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().into(), value.into());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.0.insert(field.name().into(), value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name().into(), value.into());
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().into(), value.into());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0
            .insert(field.name().into(), format!("{value:?}").into());
    }
}
