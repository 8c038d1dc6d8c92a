//! HTTP boundary
//!
//! A small axum app: `/screenshot` serves image bytes, `/health` and
//! `/metrics` serve operators.

use crate::{ScreenshotError, ScreenshotService};
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::time::timeout;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ScreenshotService>,
    pub prometheus: Option<PrometheusHandle>,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/screenshot", get(handle_screenshot))
        .route("/health", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the shutdown future resolves.
pub async fn serve(
    state: AppState,
    addr: &str,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("screenshot server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

#[derive(Debug, Deserialize)]
struct ScreenshotQuery {
    url: Option<String>,
}

async fn handle_screenshot(
    State(state): State<AppState>,
    Query(query): Query<ScreenshotQuery>,
) -> Response {
    let Some(url) = query.url else {
        return (StatusCode::BAD_REQUEST, "url query parameter is required").into_response();
    };

    let budget = state.service.config().request_timeout;
    match timeout(budget, state.service.get_screenshot(&url)).await {
        Ok(Ok(bytes)) => ([(header::CONTENT_TYPE, "image/png")], bytes).into_response(),
        Ok(Err(err)) => {
            error!(%url, kind = err.kind(), error = %err, "screenshot request failed");
            error_response(&err)
        }
        Err(_) => {
            error!(%url, budget = ?budget, "screenshot request exceeded its deadline");
            (StatusCode::GATEWAY_TIMEOUT, "screenshot request timed out").into_response()
        }
    }
}

fn error_response(err: &ScreenshotError) -> Response {
    let status = match err {
        ScreenshotError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
        ScreenshotError::CaptureTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        ScreenshotError::CacheIo(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ScreenshotError::NavigationFailed { .. }
        | ScreenshotError::BrowserFailed(_)
        | ScreenshotError::Unavailable(_) => StatusCode::BAD_GATEWAY,
    };
    (status, err.to_string()).into_response()
}

async fn handle_health(State(state): State<AppState>) -> Response {
    let body = json!({
        "status": "ok",
        "available_capture_slots": state.service.available_capture_slots(),
        "cache_dir": state.service.config().cache_dir.display().to_string(),
        "timestamp": Utc::now().to_rfc3339(),
    });
    axum::Json(body).into_response()
}

async fn handle_metrics(State(state): State<AppState>) -> Response {
    match &state.prometheus {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
