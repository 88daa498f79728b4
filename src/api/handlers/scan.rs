use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;

use crate::{
    api::{error::ErrorBody, ApiError},
    auth::{require_auth, AuthState},
    db::{models::TOOL_SCAN, LogEntry, Store},
    simulate::{generate_scan, ScanResult},
};

const MAX_TARGET_LENGTH: usize = 255;

#[derive(ToSchema, Deserialize, Debug)]
pub struct ScanRequest {
    /// Hostname or address, 1 to 255 characters.
    pub target: String,
}

#[utoipa::path(
    post,
    path = "/api/scan",
    request_body = ScanRequest,
    responses(
        (status = 200, description = "Simulated scan report.", body = ScanResult),
        (status = 401, description = "Missing or invalid bearer token.", body = ErrorBody),
        (status = 422, description = "Target is empty or too long.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "scan"
)]
pub async fn scan(
    headers: HeaderMap,
    Extension(store): Extension<Arc<dyn Store>>,
    Extension(auth): Extension<Arc<AuthState>>,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<Json<ScanResult>, ApiError> {
    let principal = require_auth(&headers, &auth)?;
    let Json(request) = payload?;

    let length = request.target.chars().count();
    if length == 0 || length > MAX_TARGET_LENGTH {
        return Err(ApiError::Validation(format!(
            "target must be between 1 and {MAX_TARGET_LENGTH} characters"
        )));
    }

    let report = generate_scan(&mut rand::thread_rng(), &request.target);

    let result = serde_json::to_value(&report).map_err(|err| {
        error!("Failed to serialize scan report: {err}");
        ApiError::Internal("Internal server error".to_string())
    })?;

    let entry = LogEntry::new(&principal.user_id, TOOL_SCAN, request.target, result);
    store.insert_log(&entry).await?;

    debug!(log_id = %entry.id, ports = report.ports.len(), "Scan recorded");

    Ok(Json(report))
}
