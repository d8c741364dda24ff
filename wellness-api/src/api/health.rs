//! Health check endpoint for load balancers and uptime monitors.

use chrono::{DateTime, Utc};
use rocket::{Route, State, serde::json::Json};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::built_info;
use crate::config::AppContext;

#[derive(Debug, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HealthStatus {
    pub status: String,
    pub success: bool,
    pub message: String,
    #[ts(type = "string")]
    pub timestamp: DateTime<Utc>,
    /// Seconds since the server context was created.
    pub uptime: f64,
    pub environment: String,
    pub version: String,
    pub built: String,
    pub git_commit: Option<String>,
}

/// Health Status endpoint.
///
/// - **URL:** `/api/health`
/// - **Method:** `GET`
/// - **Authentication:** None required
///
/// # Response
///
/// **Success (HTTP 200 OK):**
/// ```json
/// {
///   "status": "ok",
///   "success": true,
///   "message": "Server is healthy!",
///   "timestamp": "2025-08-15T18:13:43.512Z",
///   "uptime": 12.5,
///   "environment": "development",
///   "version": "0.1.0",
///   "built": "Fri, 15 Aug 2025 18:13:43 +0000",
///   "gitCommit": "cd51275141a2e7d49737aa7dd4e8ff7c9a804d67"
/// }
/// ```
#[get("/health")]
pub fn health(ctx: &State<AppContext>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        success: true,
        message: "Server is healthy!".to_string(),
        timestamp: Utc::now(),
        uptime: ctx.uptime_secs(),
        environment: ctx.config.environment.clone(),
        version: built_info::PKG_VERSION.to_string(),
        built: built_info::BUILT_TIME_UTC.to_string(),
        git_commit: built_info::GIT_COMMIT_HASH.map(str::to_string),
    })
}

pub fn routes() -> Vec<Route> {
    routes![health]
}
