use crate::collectors::collect_status;
use crate::config::Config;
use crate::metrics::Metrics;
use crate::state::Snapshot;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header::CONTENT_TYPE, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

#[derive(Clone)]
pub struct HttpAppState {
    pub metrics: Arc<Metrics>,
    pub config: Arc<Config>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ApiStatus {
    pub host_label: String,
    pub collected_at: String,
    #[serde(flatten)]
    pub snapshot: Snapshot,
}

pub fn build_router(metrics: Arc<Metrics>, config: Arc<Config>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_handler))
        .route("/api/status", get(status_handler))
        .with_state(HttpAppState { metrics, config })
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn metrics_handler(State(state): State<HttpAppState>) -> Response {
    state.metrics.inc_scrape_count();

    let started = Instant::now();
    let snapshot = collect_status(&state.config.sources).await;
    state
        .metrics
        .collect_duration_seconds
        .set(started.elapsed().as_secs_f64());
    state.metrics.update_from_snapshot(&snapshot);

    match state.metrics.encode_metrics() {
        Ok(encoded) => {
            let mut response = Response::new(Body::from(encoded));
            response.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            );
            response
        }
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("ошибка кодирования метрик: {err}"),
        )
            .into_response(),
    }
}

async fn status_handler(State(state): State<HttpAppState>) -> impl IntoResponse {
    let snapshot = collect_status(&state.config.sources).await;
    Json(ApiStatus {
        host_label: state.config.host_label.clone(),
        collected_at: humantime::format_rfc3339_seconds(SystemTime::now()).to_string(),
        snapshot,
    })
}
