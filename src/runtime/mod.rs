pub mod catalog;
pub mod cpu;
pub mod heap;
pub mod sink;
pub mod symbol;
pub mod threads;
pub mod trace;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use catalog::{EventProfile, ProfileCatalog};
pub use sink::BodySink;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("{0} is already enabled")]
    AlreadyRunning(&'static str),
    #[error("{0}")]
    Backend(String),
}

/// A process-wide recorder with exclusive start/stop semantics.
///
/// At most one session may be open per capturer. `start` must fail without
/// touching the session already in progress.
pub trait Capturer: Send + Sync {
    fn start(&self, sink: BodySink) -> Result<Box<dyn CaptureSession>, CaptureError>;
}

pub trait CaptureSession: Send {
    /// Ends the session, appending whatever is still buffered to the sink it was started with.
    fn stop(self: Box<Self>) -> anyhow::Result<()>;
}

pub trait SymbolResolver: Send + Sync {
    fn resolve(&self, addr: u64) -> Option<String>;
}

pub trait GarbageCollector: Send + Sync {
    fn collect(&self) -> anyhow::Result<()>;
}

#[async_trait]
pub trait NamedProfile: Send + Sync {
    fn name(&self) -> &str;
    fn count(&self) -> usize;
    /// Appends a snapshot to `out`. `debug` selects the format: 0 is the binary
    /// form where one exists, higher values are increasingly verbose text.
    async fn write_to(&self, out: &mut Vec<u8>, debug: u64) -> anyhow::Result<()>;
}

/// Everything the dispatcher talks to.
pub struct Runtime {
    pub cpu: Arc<dyn Capturer>,
    pub trace: Arc<dyn Capturer>,
    pub symbols: Arc<dyn SymbolResolver>,
    pub gc: Arc<dyn GarbageCollector>,
    pub catalog: Arc<ProfileCatalog>,
}

impl Runtime {
    pub fn new(cpu_frequency: i32, recorder: Arc<trace::TraceRecorder>) -> anyhow::Result<Runtime> {
        let catalog = ProfileCatalog::new();
        catalog.register(Arc::new(heap::HeapProfile::new(heap::HEAP)))?;
        catalog.register(Arc::new(heap::HeapProfile::new(heap::ALLOCS)))?;
        catalog.register(Arc::new(threads::ThreadsProfile::new()))?;
        Ok(Runtime {
            cpu: Arc::new(cpu::CpuSampler::new(cpu_frequency)),
            trace: Arc::new(recorder),
            symbols: Arc::new(symbol::BacktraceResolver),
            gc: Arc::new(heap::JemallocCollector),
            catalog: Arc::new(catalog),
        })
    }
}
