use std::sync::Arc;

use serde::Serialize;

use crate::metrics::Metrics;
use crate::runtime::Runtime;

pub const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";
pub const CONTENT_TYPE_OCTET: &str = "application/octet-stream";
pub const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";

pub const QUERY_SECONDS: &str = "seconds";
pub const QUERY_DEBUG: &str = "debug";
pub const QUERY_GC: &str = "gc";

pub const DEFAULT_SECONDS: u64 = 30;

#[derive(Clone)]
pub struct Service {
    pub runtime: Arc<Runtime>,
    pub metrics: Metrics,
    /// Diagnostic namespace, starts and ends with `/`.
    pub prefix: Arc<str>,
}

#[derive(Debug, Serialize, Clone)]
pub struct LiveResponse {
    pub status: bool,
    pub version: String,
}

/// First value of `key` in the raw query as an unsigned integer.
/// Absent, empty or malformed values read as 0.
pub fn uint_or_zero(query: Option<&str>, key: &str) -> u64 {
    let Some(query) = query else {
        return 0;
    };
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == key)
        .and_then(|(_, v)| parse_uint(&v))
        .unwrap_or(0)
}

fn parse_uint(v: &str) -> Option<u64> {
    if v.is_empty() || !v.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    v.parse().ok()
}

/// Capture duration in seconds, 0 meaning the default.
pub fn capture_seconds(query: Option<&str>) -> u64 {
    match uint_or_zero(query, QUERY_SECONDS) {
        0 => DEFAULT_SECONDS,
        v => v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_uint_or_zero() {
        assert_eq!(uint_or_zero(None, "debug"), 0);
        assert_eq!(uint_or_zero(Some(""), "debug"), 0);
        assert_eq!(uint_or_zero(Some("debug=2"), "debug"), 2);
        assert_eq!(uint_or_zero(Some("gc=1&debug=1"), "debug"), 1);
        assert_eq!(uint_or_zero(Some("debug=1&debug=5"), "debug"), 1);
        assert_eq!(uint_or_zero(Some("debug="), "debug"), 0);
        assert_eq!(uint_or_zero(Some("debug=-1"), "debug"), 0);
        assert_eq!(uint_or_zero(Some("debug=%2B1"), "debug"), 0);
        assert_eq!(uint_or_zero(Some("debug=abc"), "debug"), 0);
        assert_eq!(uint_or_zero(Some("debug=99999999999999999999999"), "debug"), 0);
        assert_eq!(uint_or_zero(Some("debugx=3"), "debug"), 0);
    }

    #[test]
    fn test_capture_seconds() {
        assert_eq!(capture_seconds(None), 30);
        assert_eq!(capture_seconds(Some("seconds=0")), 30);
        assert_eq!(capture_seconds(Some("seconds=bad")), 30);
        assert_eq!(capture_seconds(Some("seconds=5")), 5);
    }
}
