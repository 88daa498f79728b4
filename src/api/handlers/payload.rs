use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::HeaderMap,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;

use crate::{
    api::{error::ErrorBody, ApiError},
    auth::{require_auth, AuthState},
    db::{models::TOOL_PAYLOAD, LogEntry, Store},
    simulate::{generate_payload_response, PayloadResponse, PayloadType},
};

#[derive(ToSchema, Deserialize, Debug)]
pub struct PayloadRequest {
    pub payload_type: PayloadType,
    pub target_url: String,
    pub payload: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PayloadResult {
    pub payload_type: PayloadType,
    pub target_url: String,
    pub payload: String,
    /// Mirrors `response.vulnerability_detected`.
    pub success: bool,
    pub response: PayloadResponse,
    pub timestamp: DateTime<Utc>,
}

#[utoipa::path(
    post,
    path = "/api/payload",
    request_body = PayloadRequest,
    responses(
        (status = 200, description = "Simulated payload outcome.", body = PayloadResult),
        (status = 401, description = "Missing or invalid bearer token.", body = ErrorBody),
        (status = 422, description = "Unknown payload type or empty field.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "payload"
)]
pub async fn payload(
    headers: HeaderMap,
    Extension(store): Extension<Arc<dyn Store>>,
    Extension(auth): Extension<Arc<AuthState>>,
    request: Result<Json<PayloadRequest>, JsonRejection>,
) -> Result<Json<PayloadResult>, ApiError> {
    let principal = require_auth(&headers, &auth)?;
    let Json(request) = request?;

    if request.target_url.is_empty() {
        return Err(ApiError::Validation("target_url must not be empty".to_string()));
    }
    if request.payload.is_empty() {
        return Err(ApiError::Validation("payload must not be empty".to_string()));
    }

    let response =
        generate_payload_response(&mut rand::thread_rng(), request.payload_type, &request.payload);

    let outcome = PayloadResult {
        payload_type: request.payload_type,
        success: response.vulnerability_detected,
        response,
        target_url: request.target_url,
        payload: request.payload,
        timestamp: Utc::now(),
    };

    let result = serde_json::to_value(&outcome).map_err(|err| {
        error!("Failed to serialize payload result: {err}");
        ApiError::Internal("Internal server error".to_string())
    })?;

    let input = format!("{}: {}", outcome.payload_type, outcome.target_url);
    let entry = LogEntry::new(&principal.user_id, TOOL_PAYLOAD, input, result);
    store.insert_log(&entry).await?;

    debug!(log_id = %entry.id, success = outcome.success, "Payload test recorded");

    Ok(Json(outcome))
}
