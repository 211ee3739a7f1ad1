use std::borrow::Cow;

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use thiserror::Error;

use super::capture::CaptureKind;
use super::data::CONTENT_TYPE_TEXT;
use crate::runtime::CaptureError;

#[derive(Debug, Error)]
pub enum DiagError {
    #[error("Unknown profile: {0}")]
    UnknownProfile(String),
    #[error("Could not enable {}: {}", .kind.describe(), .source)]
    CaptureStart {
        kind: CaptureKind,
        source: CaptureError,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DiagResult<T> = std::result::Result<T, DiagError>;

impl IntoResponse for DiagError {
    fn into_response(self) -> axum::response::Response {
        let (status, message): (StatusCode, Cow<'static, str>) = match &self {
            DiagError::UnknownProfile(name) => {
                tracing::debug!(name = %name, "unknown profile");
                (StatusCode::NOT_FOUND, Cow::Owned(format!("{self}\n")))
            }
            DiagError::CaptureStart { kind, source } => {
                tracing::warn!(kind = kind.label(), error = %source, "capture not started");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Cow::Owned(format!("{self}\n")),
                )
            }
            DiagError::Other(err) => {
                tracing::error!("{}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Cow::Borrowed("Internal Server Error\n"),
                )
            }
        };

        (status, [(header::CONTENT_TYPE, CONTENT_TYPE_TEXT)], message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;

    async fn _test_response(err: DiagError, status: StatusCode, body: &str) {
        let res = err.into_response();
        assert_eq!(res.status(), status);
        assert_eq!(res.headers()[header::CONTENT_TYPE], CONTENT_TYPE_TEXT);
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(std::str::from_utf8(&bytes).unwrap(), body);
    }

    #[tokio::test]
    async fn test_into_response() {
        _test_response(
            DiagError::UnknownProfile("olia".to_string()),
            StatusCode::NOT_FOUND,
            "Unknown profile: olia\n",
        )
        .await;
        _test_response(
            DiagError::CaptureStart {
                kind: CaptureKind::Cpu,
                source: CaptureError::AlreadyRunning("cpu profiling"),
            },
            StatusCode::INTERNAL_SERVER_ERROR,
            "Could not enable CPU profiling: cpu profiling is already enabled\n",
        )
        .await;
        _test_response(
            DiagError::CaptureStart {
                kind: CaptureKind::Trace,
                source: CaptureError::Backend("no sink".to_string()),
            },
            StatusCode::INTERNAL_SERVER_ERROR,
            "Could not enable tracing: no sink\n",
        )
        .await;
    }
}
