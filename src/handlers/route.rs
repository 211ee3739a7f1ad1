pub const CMDLINE: &str = "cmdline";
pub const PROFILE: &str = "profile";
pub const SYMBOL: &str = "symbol";
pub const TRACE: &str = "trace";

/// Diagnostic resource addressed by a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    Index,
    Cmdline,
    Profile,
    Symbol,
    Trace,
    Named(&'a str),
}

impl<'a> Route<'a> {
    /// Classifies `path` under `prefix`. Paths outside the prefix are not
    /// ours and yield `None`. Matching is exact: no decoding and no
    /// trailing slash normalization.
    pub fn classify(prefix: &str, path: &'a str) -> Option<Route<'a>> {
        let name = path.strip_prefix(prefix)?;
        Some(match name {
            "" => Route::Index,
            CMDLINE => Route::Cmdline,
            PROFILE => Route::Profile,
            SYMBOL => Route::Symbol,
            TRACE => Route::Trace,
            other => Route::Named(other),
        })
    }
}
