pub mod capture;
pub mod cmdline;
pub mod data;
pub mod error;
pub mod index;
pub mod live;
pub mod metrics;
pub mod named;
pub mod route;
pub mod symbol;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;

use capture::CaptureKind;
use data::Service;
use route::Route;

/// Routes for the diagnostic namespace. Anything outside `srv.prefix` is
/// left to the enclosing router.
pub fn router(srv: Service) -> Router {
    let prefix = srv.prefix.to_string();
    Router::new()
        .route(&prefix, any(dispatch))
        .route(&format!("{prefix}*rest"), any(dispatch))
        .with_state(srv)
}

pub async fn dispatch(
    State(srv): State<Service>,
    method: Method,
    uri: Uri,
    body: Body,
) -> Response {
    let Some(route) = Route::classify(&srv.prefix, uri.path()) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    tracing::debug!(?route, %method, "pprof request");
    let query = uri.query();
    match route {
        Route::Index => index::handler(&srv).await,
        Route::Cmdline => cmdline::handler().await,
        Route::Profile => capture::handler(&srv, CaptureKind::Cpu, query).await,
        Route::Trace => capture::handler(&srv, CaptureKind::Trace, query).await,
        Route::Symbol => symbol::handler(&srv, &method, query, body).await,
        Route::Named(name) => named::handler(&srv, name, query).await.into_response(),
    }
}
