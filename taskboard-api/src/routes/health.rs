/// Service banner and health check
///
/// # Endpoints
///
/// - `GET /` - Service name, version and environment
/// - `GET /health` - Liveness plus store connectivity
///
/// # Response
///
/// ```json
/// {
///   "status": "ok",
///   "timestamp": "2025-01-01T00:00:00Z",
///   "version": "0.1.0",
///   "database": "postgres connected",
///   "environment": "development"
/// }
/// ```

use crate::app::AppState;
use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Service banner
#[derive(Debug, Serialize, Deserialize)]
pub struct BannerResponse {
    pub message: String,
    pub version: String,
    pub environment: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the store is unreachable
    pub status: String,

    pub timestamp: DateTime<Utc>,

    /// Application version
    pub version: String,

    /// `connected` or `disconnected`, prefixed with the store backend
    pub database: String,

    pub environment: String,
}

pub async fn banner(State(state): State<AppState>) -> Json<BannerResponse> {
    Json(BannerResponse {
        message: "Project Management API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.config.api.environment.clone(),
    })
}

/// Health check handler
///
/// Answers 503 when the store does not respond, so load balancers can take
/// the instance out of rotation.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status_code, status, connectivity) = match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "ok", "connected"),
        Err(e) => {
            tracing::warn!(error = %e, "Health check: store unreachable");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", "disconnected")
        }
    };

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: format!("{} {}", state.store.backend(), connectivity),
            environment: state.config.api.environment.clone(),
        }),
    )
}
