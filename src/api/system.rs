//! Service-level endpoints outside `/api`: banner and health probe.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;

use super::{ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub uptime: u64,
}

/// `GET /`
pub async fn root() -> impl IntoResponse {
    Json(ApiResponse::success(RootResponse {
        message: "Roster API is running",
        version: env!("CARGO_PKG_VERSION"),
    }))
}

/// `GET /health`
///
/// Reports 503 when the database does not answer.
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let database = state.store().ping().await.is_ok();

    let (status, label) = if database {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(ApiResponse::success(HealthResponse {
            status: label,
            database,
            uptime: state.start_time.elapsed().as_secs(),
        })),
    )
        .into_response()
}
