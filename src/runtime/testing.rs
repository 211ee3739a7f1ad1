use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{
    BodySink, CaptureError, CaptureSession, Capturer, GarbageCollector, NamedProfile,
    ProfileCatalog, Runtime, SymbolResolver,
};

/// Exclusive capturer writing `<tag> start\n` on start and `<tag> stop\n` on stop.
pub struct FakeCapturer {
    tag: &'static str,
    running: Arc<AtomicBool>,
    pub starts: AtomicUsize,
}

impl FakeCapturer {
    pub fn new(tag: &'static str) -> FakeCapturer {
        FakeCapturer {
            tag,
            running: Arc::new(AtomicBool::new(false)),
            starts: AtomicUsize::new(0),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Capturer for FakeCapturer {
    fn start(&self, sink: BodySink) -> Result<Box<dyn CaptureSession>, CaptureError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(CaptureError::AlreadyRunning(self.tag));
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        sink.write(format!("{} start\n", self.tag));
        Ok(Box::new(FakeSession {
            tag: self.tag,
            running: self.running.clone(),
            sink,
        }))
    }
}

struct FakeSession {
    tag: &'static str,
    running: Arc<AtomicBool>,
    sink: BodySink,
}

impl CaptureSession for FakeSession {
    fn stop(self: Box<Self>) -> anyhow::Result<()> {
        self.sink.write(format!("{} stop\n", self.tag));
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }
}

pub struct StaticProfile {
    name: String,
    count: usize,
    body: String,
}

impl StaticProfile {
    pub fn new(name: &str, count: usize, body: &str) -> StaticProfile {
        StaticProfile {
            name: name.to_string(),
            count,
            body: body.to_string(),
        }
    }
}

#[async_trait]
impl NamedProfile for StaticProfile {
    fn name(&self) -> &str {
        &self.name
    }

    fn count(&self) -> usize {
        self.count
    }

    async fn write_to(&self, out: &mut Vec<u8>, debug: u64) -> anyhow::Result<()> {
        out.extend_from_slice(format!("{} debug={debug}\n", self.body).as_bytes());
        Ok(())
    }
}

/// Heap stand-in that remembers how many collections had run by the time
/// each snapshot was written.
pub struct GcSnapshotProfile {
    gc: Arc<CountingGc>,
    seen: Mutex<Vec<usize>>,
}

impl GcSnapshotProfile {
    pub fn new(gc: Arc<CountingGc>) -> GcSnapshotProfile {
        GcSnapshotProfile {
            gc,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<usize> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl NamedProfile for GcSnapshotProfile {
    fn name(&self) -> &str {
        "heap"
    }

    fn count(&self) -> usize {
        3
    }

    async fn write_to(&self, out: &mut Vec<u8>, debug: u64) -> anyhow::Result<()> {
        self.seen.lock().unwrap().push(self.gc.runs());
        out.extend_from_slice(format!("heap snapshot debug={debug}\n").as_bytes());
        Ok(())
    }
}

/// Writes part of a snapshot, then fails.
pub struct BrokenProfile(pub &'static str);

#[async_trait]
impl NamedProfile for BrokenProfile {
    fn name(&self) -> &str {
        self.0
    }

    fn count(&self) -> usize {
        1
    }

    async fn write_to(&self, out: &mut Vec<u8>, _debug: u64) -> anyhow::Result<()> {
        out.extend_from_slice(b"partial\n");
        anyhow::bail!("snapshot interrupted")
    }
}

#[derive(Default)]
pub struct FakeResolver(pub HashMap<u64, String>);

impl SymbolResolver for FakeResolver {
    fn resolve(&self, addr: u64) -> Option<String> {
        self.0.get(&addr).cloned()
    }
}

#[derive(Default)]
pub struct CountingGc(pub AtomicUsize);

impl CountingGc {
    pub fn runs(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl GarbageCollector for CountingGc {
    fn collect(&self) -> anyhow::Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct Fakes {
    pub cpu: Arc<FakeCapturer>,
    pub trace: Arc<FakeCapturer>,
    pub gc: Arc<CountingGc>,
    pub heap: Arc<GcSnapshotProfile>,
    pub catalog: Arc<ProfileCatalog>,
}

/// Runtime made of fakes, with a `heap` profile already registered.
pub fn fake_runtime(symbols: &[(u64, &str)]) -> (Runtime, Fakes) {
    let gc = Arc::new(CountingGc::default());
    let fakes = Fakes {
        cpu: Arc::new(FakeCapturer::new("cpu")),
        trace: Arc::new(FakeCapturer::new("trace")),
        heap: Arc::new(GcSnapshotProfile::new(gc.clone())),
        gc,
        catalog: Arc::new(ProfileCatalog::new()),
    };
    fakes.catalog.register(fakes.heap.clone()).unwrap();
    let resolver = FakeResolver(symbols.iter().map(|(a, n)| (*a, n.to_string())).collect());
    let runtime = Runtime {
        cpu: fakes.cpu.clone(),
        trace: fakes.trace.clone(),
        symbols: Arc::new(resolver),
        gc: fakes.gc.clone(),
        catalog: fakes.catalog.clone(),
    };
    (runtime, fakes)
}
