use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use pprof::protos::Message;
use pprof::ProfilerGuard;

use super::{BodySink, CaptureError, CaptureSession, Capturer};

/// CPU sampler backed by the process-global `pprof` profiler.
pub struct CpuSampler {
    frequency: i32,
}

impl CpuSampler {
    pub fn new(frequency: i32) -> CpuSampler {
        CpuSampler { frequency }
    }
}

impl Capturer for CpuSampler {
    fn start(&self, sink: BodySink) -> Result<Box<dyn CaptureSession>, CaptureError> {
        let guard = ProfilerGuard::new(self.frequency).map_err(|err| match err {
            pprof::Error::Running => CaptureError::AlreadyRunning("cpu profiling"),
            other => CaptureError::Backend(other.to_string()),
        })?;
        tracing::debug!(frequency = self.frequency, "cpu sampler started");
        Ok(Box::new(CpuSession { guard, sink }))
    }
}

struct CpuSession {
    guard: ProfilerGuard<'static>,
    sink: BodySink,
}

impl CaptureSession for CpuSession {
    fn stop(self: Box<Self>) -> anyhow::Result<()> {
        let CpuSession { guard, sink } = *self;
        let report = guard.report().build()?;
        // the sampler keeps running until the guard goes away
        drop(guard);
        let profile = report.pprof()?;
        let data = gzip(&profile.encode_to_vec())?;
        tracing::debug!(bytes = data.len(), "cpu profile encoded");
        if !sink.write(data) {
            tracing::warn!("client left before cpu profile was written");
        }
        Ok(())
    }
}

fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}
