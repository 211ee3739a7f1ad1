use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;

use axum::http::header;
use axum::response::{IntoResponse, Response};

use super::data::CONTENT_TYPE_TEXT;

pub async fn handler() -> Response {
    (
        [(header::CONTENT_TYPE, CONTENT_TYPE_TEXT)],
        join_args(std::env::args_os()),
    )
        .into_response()
}

/// Arguments separated by single NUL bytes, no trailing separator.
pub fn join_args<I, S>(args: I) -> Vec<u8>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut res = Vec::new();
    for (i, arg) in args.into_iter().enumerate() {
        if i > 0 {
            res.push(0);
        }
        res.extend_from_slice(arg.as_ref().as_bytes());
    }
    res
}
