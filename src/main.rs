use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::{routing::get, Router};
use clap::Parser;
use pprof_http::config::{Args, Config};
use pprof_http::handlers::{self, data::Service};
use pprof_http::metrics::Metrics;
use pprof_http::runtime::trace::TraceRecorder;
use pprof_http::runtime::{EventProfile, Runtime};
use pprof_http::utils::perf::PerfLogger;
use pprof_http::workload;
use std::process;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let recorder = Arc::new(TraceRecorder::new());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::Layer::default()
                .compact()
                .with_filter(tracing_subscriber::EnvFilter::from_default_env()),
        )
        // captures see debug events whatever RUST_LOG says
        .with(recorder.layer().with_filter(LevelFilter::DEBUG))
        .init();
    let cfg = Config::build(Args::parse()).unwrap_or_else(|err| {
        tracing::error!("problem parsing arguments: {err}");
        process::exit(1)
    });
    if let Err(e) = main_int(cfg, recorder).await {
        tracing::error!("{}", e);
        return Err(e);
    }
    Ok(())
}

async fn main_int(cfg: Config, recorder: Arc<TraceRecorder>) -> anyhow::Result<()> {
    let _perf_log = PerfLogger::new("loading service");
    tracing::info!("Starting pprof service");
    tracing::info!(version = cfg.version);
    tracing::info!(port = cfg.port);
    tracing::info!(prefix = cfg.prefix);

    let cancel_token = CancellationToken::new();

    let ct = cancel_token.clone();
    let mut int_stream = signal(SignalKind::interrupt())?;
    let mut term_stream = signal(SignalKind::terminate())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = int_stream.recv() => tracing::info!("Exit event int"),
            _ = term_stream.recv() => tracing::info!("Exit event term"),
        }
        tracing::debug!("sending exit event");
        ct.cancel();
    });

    let runtime = Runtime::new(cfg.cpu_frequency, recorder)?;
    if cfg.workload {
        let items = Arc::new(EventProfile::new(workload::PROFILE));
        runtime.catalog.register(items.clone())?;
        tokio::spawn(workload::run(items, cancel_token.clone()));
    }

    let metrics = Metrics::new(prometheus::default_registry())?;
    let srv = Service {
        runtime: Arc::new(runtime),
        metrics: metrics.clone(),
        prefix: Arc::from(cfg.prefix.as_str()),
    };

    // no timeout layer: captures hold the request for their whole duration
    let app = Router::new()
        .route("/live", get(handlers::live::handler))
        .route("/metrics", get(handlers::metrics::handler))
        .merge(handlers::router(srv))
        .layer(middleware::from_fn(move |req: Request, next: Next| {
            let metrics = metrics.clone();
            async move { metrics.observe(req, next).await }
        }))
        .layer((RequestBodyLimitLayer::new(1024 * 1024), TraceLayer::new_for_http()));

    std::mem::drop(_perf_log);
    tracing::info!(port = cfg.port, "serving ...");

    let listener = TcpListener::bind(format!("0.0.0.0:{}", cfg.port)).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel_token.cancelled().await;
        })
        .await?;

    tracing::info!("Bye");
    Ok(())
}
