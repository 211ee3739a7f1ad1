use std::time::Instant;

/// Logs how long the enclosing scope took once dropped.
pub struct PerfLogger {
    start: Instant,
    name: String,
}

impl Drop for PerfLogger {
    fn drop(&mut self) {
        tracing::info!(name = %self.name, elapsed = ?self.start.elapsed(), "done");
    }
}

impl PerfLogger {
    pub fn new(name: &str) -> PerfLogger {
        tracing::debug!(name, "start");
        PerfLogger {
            start: Instant::now(),
            name: name.to_string(),
        }
    }
}
