use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use async_trait::async_trait;

use super::NamedProfile;

pub const THREADS: &str = "threads";
const TASK_DIR: &str = "/proc/self/task";

#[derive(Debug, Clone, PartialEq)]
pub struct ThreadInfo {
    pub tid: u32,
    pub name: String,
    pub state: char,
    pub utime: u64,
    pub stime: u64,
}

/// OS threads of this process as seen by procfs.
pub struct ThreadsProfile {
    dir: String,
}

impl ThreadsProfile {
    pub fn new() -> ThreadsProfile {
        ThreadsProfile {
            dir: TASK_DIR.to_string(),
        }
    }

    fn threads(&self) -> anyhow::Result<Vec<ThreadInfo>> {
        list_threads(Path::new(&self.dir))
    }
}

impl Default for ThreadsProfile {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NamedProfile for ThreadsProfile {
    fn name(&self) -> &str {
        THREADS
    }

    fn count(&self) -> usize {
        fs::read_dir(&self.dir).map_or(0, |entries| entries.count())
    }

    async fn write_to(&self, out: &mut Vec<u8>, debug: u64) -> anyhow::Result<()> {
        let threads = self.threads()?;
        out.extend_from_slice(format_threads(&threads, debug)?.as_bytes());
        Ok(())
    }
}

fn list_threads(dir: &Path) -> anyhow::Result<Vec<ThreadInfo>> {
    let mut res = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let Some(tid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) else {
            continue;
        };
        // the thread may exit between listing and reading
        let Ok(stat) = fs::read_to_string(entry.path().join("stat")) else {
            continue;
        };
        if let Some(info) = parse_stat(tid, &stat) {
            res.push(info);
        }
    }
    res.sort_by_key(|t| t.tid);
    Ok(res)
}

/// Parses `/proc/<pid>/task/<tid>/stat`. The name is wrapped in parentheses
/// and may itself contain spaces or parentheses.
fn parse_stat(tid: u32, stat: &str) -> Option<ThreadInfo> {
    let open = stat.find('(')?;
    let close = stat.rfind(')')?;
    let name = stat.get(open + 1..close)?.to_string();
    let fields: Vec<&str> = stat.get(close + 1..)?.split_whitespace().collect();
    Some(ThreadInfo {
        tid,
        name,
        state: fields.first()?.chars().next()?,
        utime: fields.get(11)?.parse().ok()?,
        stime: fields.get(12)?.parse().ok()?,
    })
}

fn format_threads(threads: &[ThreadInfo], debug: u64) -> anyhow::Result<String> {
    let mut res = format!("{THREADS} profile: total {}\n", threads.len());
    for t in threads {
        if debug >= 2 {
            writeln!(
                res,
                "thread {} [{}]: state={} utime={} stime={}",
                t.tid, t.name, t.state, t.utime, t.stime
            )?;
        } else {
            writeln!(res, "{} {}", t.tid, t.name)?;
        }
    }
    Ok(res)
}
