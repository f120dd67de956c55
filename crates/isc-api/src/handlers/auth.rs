//! Admin login handlers.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{verify_password, AdminUser};
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub message: String,
    /// Token lifetime in seconds
    pub expires_in: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub valid: bool,
    pub admin_id: String,
}

/// Exchange the admin password for a bearer token.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    if request.password.is_empty() {
        return Err(ApiError::bad_request("Password required"));
    }

    let stored = state
        .config
        .admin_password_hash
        .clone()
        .ok_or_else(|| ApiError::unavailable("Admin login is not configured"))?;

    let password = request.password;
    let valid = tokio::task::spawn_blocking(move || verify_password(&stored, &password))
        .await
        .map_err(|e| ApiError::internal(format!("Password check failed: {}", e)))?;

    if !valid {
        warn!("Rejected admin login");
        metrics::record_login(false);
        return Err(ApiError::unauthorized("Incorrect password"));
    }

    let token = state.jwt.issue()?;
    metrics::record_login(true);
    info!("Admin logged in");

    Ok(Json(LoginResponse {
        token,
        message: "Login successful".to_string(),
        expires_in: state.jwt.ttl().as_secs(),
    }))
}

/// Check the bearer token.
pub async fn verify(admin: AdminUser) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        valid: true,
        admin_id: admin.subject,
    })
}
