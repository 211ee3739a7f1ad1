use std::ffi::c_char;
use std::fmt::Write as _;
use std::ptr;

use async_trait::async_trait;
use tikv_jemalloc_ctl::{epoch, stats};

use super::{GarbageCollector, NamedProfile};

pub const HEAP: &str = "heap";
pub const ALLOCS: &str = "allocs";

/// Matches `lg_prof_sample` in the allocator's `malloc_conf`.
const LG_PROF_SAMPLE: u32 = 19;
/// `MALLCTL_ARENAS_ALL`
const PURGE_ALL_ARENAS: &[u8] = b"arena.4096.purge\0";

/// jemalloc heap profile.
///
/// debug=0 is a gzipped pprof protobuf, anything above is an allocator
/// statistics summary.
pub struct HeapProfile {
    name: &'static str,
}

impl HeapProfile {
    pub fn new(name: &'static str) -> HeapProfile {
        HeapProfile { name }
    }
}

#[async_trait]
impl NamedProfile for HeapProfile {
    fn name(&self) -> &str {
        self.name
    }

    /// Expected number of sampled allocations for the bytes currently allocated.
    fn count(&self) -> usize {
        read_stat(stats::allocated::read).map_or(0, |v| v >> LG_PROF_SAMPLE)
    }

    async fn write_to(&self, out: &mut Vec<u8>, debug: u64) -> anyhow::Result<()> {
        let activated = match jemalloc_pprof::PROF_CTL.as_ref() {
            Some(ctl) => {
                let mut prof_ctl = ctl.lock().await;
                if debug == 0 {
                    if !prof_ctl.activated() {
                        anyhow::bail!("heap profiling not activated");
                    }
                    let pprof = prof_ctl.dump_pprof().map_err(|err| anyhow::anyhow!(err))?;
                    out.extend_from_slice(&pprof);
                    return Ok(());
                }
                prof_ctl.activated()
            }
            None if debug == 0 => anyhow::bail!("heap profiling not activated"),
            None => false,
        };
        out.extend_from_slice(stats_summary(self.name, activated)?.as_bytes());
        Ok(())
    }
}

fn read_stat(read: fn() -> Result<usize, tikv_jemalloc_ctl::Error>) -> anyhow::Result<usize> {
    read().map_err(|err| anyhow::anyhow!("jemalloc: {err}"))
}

fn stats_summary(name: &str, activated: bool) -> anyhow::Result<String> {
    epoch::advance().map_err(|err| anyhow::anyhow!("jemalloc: {err}"))?;
    let allocated = read_stat(stats::allocated::read)?;
    let mut res = format!(
        "{name} profile: {} sampled allocations, {allocated} bytes\n",
        allocated >> LG_PROF_SAMPLE
    );
    writeln!(res, "\n# jemalloc stats")?;
    writeln!(res, "# Allocated = {allocated}")?;
    writeln!(res, "# Active = {}", read_stat(stats::active::read)?)?;
    writeln!(res, "# Metadata = {}", read_stat(stats::metadata::read)?)?;
    writeln!(res, "# Resident = {}", read_stat(stats::resident::read)?)?;
    writeln!(res, "# Mapped = {}", read_stat(stats::mapped::read)?)?;
    writeln!(res, "# Retained = {}", read_stat(stats::retained::read)?)?;
    writeln!(res, "# ProfilingActive = {activated}")?;
    Ok(res)
}

/// Returns unused dirty pages of every arena to the OS and refreshes the
/// allocator statistics, so the next heap snapshot reflects only live memory.
pub struct JemallocCollector;

impl GarbageCollector for JemallocCollector {
    fn collect(&self) -> anyhow::Result<()> {
        // SAFETY: the name is NUL terminated and purge takes neither an old nor a new value.
        let code = unsafe {
            tikv_jemalloc_sys::mallctl(
                PURGE_ALL_ARENAS.as_ptr() as *const c_char,
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
                0,
            )
        };
        if code != 0 {
            anyhow::bail!("jemalloc purge failed: {code}");
        }
        epoch::advance().map_err(|err| anyhow::anyhow!("jemalloc: {err}"))?;
        tracing::debug!("heap purged");
        Ok(())
    }
}
