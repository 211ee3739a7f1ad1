use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use backtrace::Backtrace;

use super::symbol;
use super::NamedProfile;

/// Registry of named snapshot profiles, ordered by name.
#[derive(Default)]
pub struct ProfileCatalog {
    profiles: RwLock<BTreeMap<String, Arc<dyn NamedProfile>>>,
}

impl ProfileCatalog {
    pub fn new() -> ProfileCatalog {
        ProfileCatalog::default()
    }

    pub fn register(&self, profile: Arc<dyn NamedProfile>) -> anyhow::Result<()> {
        let mut profiles = self.profiles.write().unwrap_or_else(PoisonError::into_inner);
        let name = profile.name().to_string();
        if profiles.contains_key(&name) {
            anyhow::bail!("profile `{name}` already registered");
        }
        tracing::debug!(name = %name, "profile registered");
        profiles.insert(name, profile);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn NamedProfile>> {
        self.profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn profiles(&self) -> Vec<Arc<dyn NamedProfile>> {
        self.profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

/// A profile of live application objects.
///
/// Each key is recorded together with the call stack that added it, so a
/// snapshot shows where the objects still alive were created.
pub struct EventProfile {
    name: String,
    entries: Mutex<HashMap<u64, Backtrace>>,
}

impl EventProfile {
    pub fn new(name: &str) -> EventProfile {
        EventProfile {
            name: name.to_string(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn add(&self, key: u64) -> anyhow::Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(&key) {
            anyhow::bail!("{}: key {key} already present", self.name);
        }
        entries.insert(key, Backtrace::new_unresolved());
        Ok(())
    }

    pub fn remove(&self, key: u64) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key)
            .is_some()
    }

    fn stacks(&self) -> Vec<(usize, Vec<u64>)> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut grouped: HashMap<Vec<u64>, usize> = HashMap::new();
        for bt in entries.values() {
            let pcs: Vec<u64> = bt.frames().iter().map(|f| f.ip() as u64).collect();
            *grouped.entry(pcs).or_default() += 1;
        }
        let mut res: Vec<_> = grouped.into_iter().map(|(pcs, n)| (n, pcs)).collect();
        res.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        res
    }
}

#[async_trait]
impl NamedProfile for EventProfile {
    fn name(&self) -> &str {
        &self.name
    }

    fn count(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    async fn write_to(&self, out: &mut Vec<u8>, debug: u64) -> anyhow::Result<()> {
        let stacks = self.stacks();
        let total: usize = stacks.iter().map(|(n, _)| n).sum();
        let mut res = format!("{} profile: total {total}\n", self.name);
        for (n, pcs) in stacks {
            let addrs: Vec<String> = pcs.iter().map(|pc| format!("{pc:#x}")).collect();
            writeln!(res, "{n} @ {}", addrs.join(" "))?;
            if debug > 0 {
                for pc in pcs {
                    let name = symbol::resolve_name(pc).unwrap_or_else(|| "?".to_string());
                    writeln!(res, "#\t{pc:#x}\t{name}")?;
                }
                res.push('\n');
            }
        }
        out.extend_from_slice(res.as_bytes());
        Ok(())
    }
}
