use std::ffi::c_void;

use super::SymbolResolver;

/// Resolves code addresses of this process through its own debug info.
pub struct BacktraceResolver;

impl SymbolResolver for BacktraceResolver {
    fn resolve(&self, addr: u64) -> Option<String> {
        resolve_name(addr)
    }
}

/// Name of the function containing `addr`, demangled, without the hash suffix.
pub fn resolve_name(addr: u64) -> Option<String> {
    if addr == 0 {
        return None;
    }
    // resolve() treats its input as a return address and looks one byte back
    let pc = usize::try_from(addr).ok()?.checked_add(1)?;
    let mut res = None;
    backtrace::resolve(pc as *mut c_void, |symbol| {
        if res.is_none() {
            res = symbol.name().map(|name| format!("{name:#}"));
        }
    });
    res
}
