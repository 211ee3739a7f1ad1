use axum::http::header;
use axum::response::{IntoResponse, Response};

use super::data::{uint_or_zero, Service, CONTENT_TYPE_TEXT, QUERY_DEBUG, QUERY_GC};
use super::error::{DiagError, DiagResult};
use crate::runtime::heap::HEAP;

/// Writes a snapshot of a registered profile.
///
/// `gc` is honored for the heap profile only.
pub async fn handler(srv: &Service, name: &str, query: Option<&str>) -> DiagResult<Response> {
    let profile = srv
        .runtime
        .catalog
        .lookup(name)
        .ok_or_else(|| DiagError::UnknownProfile(name.to_string()))?;
    let verbosity = uint_or_zero(query, QUERY_DEBUG);
    if name == HEAP && uint_or_zero(query, QUERY_GC) > 0 {
        if let Err(err) = srv.runtime.gc.collect() {
            tracing::warn!(error = %err, "collect before heap snapshot");
        }
    }
    let mut out = Vec::new();
    if let Err(err) = profile.write_to(&mut out, verbosity).await {
        tracing::warn!(name, debug = verbosity, error = %err, "write profile");
    }
    Ok(([(header::CONTENT_TYPE, CONTENT_TYPE_TEXT)], out).into_response())
}
