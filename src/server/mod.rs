//! # Server — HTTP Front for the Download Check
//!
//! A small Axum server exposing the download check and the usual
//! orchestration endpoints.
//!
//! | Endpoint | Purpose |
//! |----------|---------|
//! | `GET /downloads` | Run one sweep, reconcile, return the active report (`{}` if none) |
//! | `GET /healthz` | Liveness |
//! | `GET /readyz` | Readiness (report store reachable) |
//! | `GET /metrics` | Prometheus scrape |

mod routes_downloads;
mod routes_health;

use crate::checker::DownloadChecker;
use crate::prom_metrics;
use anyhow::Result;
use axum::extract::Request;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Instrument};

/// Slack added on top of the worst-case sweep time before a request is cut.
const REQUEST_TIMEOUT_SLACK: Duration = Duration::from_secs(30);

pub struct AppState {
    pub checker: DownloadChecker,
    /// Upper bound for one `GET /downloads`: every probe timing out, plus slack.
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(checker: DownloadChecker, probe_timeout: Duration) -> Arc<Self> {
        let request_timeout = probe_timeout
            .saturating_mul(checker.probe_count() as u32)
            .saturating_add(REQUEST_TIMEOUT_SLACK);
        Arc::new(AppState {
            checker,
            request_timeout,
        })
    }
}

/// Records request duration and wraps the request in a span carrying a
/// request ID (propagated from `x-request-id` or freshly generated).
async fn metrics_middleware(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> axum::response::Response {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let start = std::time::Instant::now();

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );
    let mut response = next.run(req).instrument(span).await;

    state
        .checker
        .metrics()
        .http_request_duration
        .get_or_create(&prom_metrics::HttpLabel { method, path })
        .observe(start.elapsed().as_secs_f64());

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let request_timeout = state.request_timeout;
    Router::new()
        .route("/downloads", get(routes_downloads::handler_downloads))
        .route("/healthz", get(routes_health::handler_healthz))
        .route("/readyz", get(routes_health::handler_readyz))
        .route("/metrics", get(routes_health::handler_metrics))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET]),
        )
        .layer(CatchPanicLayer::new())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .with_state(state)
}

pub async fn run(port: u16, state: Arc<AppState>) -> Result<()> {
    let app = build_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(port, "outage probe listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown requested");
}
