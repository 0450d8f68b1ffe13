use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;

use crate::error::{api_success, ApiResponse};
use crate::server::{EhrServer, StorageKind};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// RFC 3339
    pub timestamp: String,
    pub version: &'static str,
    /// Seconds since the server state was built
    pub uptime: u64,
    pub storage: StorageKind,
}

pub async fn health_check(State(server): State<EhrServer>) -> Json<ApiResponse<HealthResponse>> {
    Json(api_success(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION"),
        uptime: server.started_at.elapsed().as_secs(),
        storage: server.storage,
    }))
}
