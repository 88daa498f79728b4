use axum::{extract::Extension, http::HeaderMap, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    api::{error::ErrorBody, ApiError},
    auth::{require_auth, AuthState},
    simulate::{generate_capture, PcapData, SETUP_GUIDE},
};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SetupGuide {
    pub content: String,
    pub format: String,
}

#[utoipa::path(
    get,
    path = "/api/pcap",
    responses(
        (status = 200, description = "Simulated capture summary.", body = PcapData),
        (status = 401, description = "Missing or invalid bearer token.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "pcap"
)]
pub async fn pcap(
    headers: HeaderMap,
    Extension(auth): Extension<Arc<AuthState>>,
) -> Result<Json<PcapData>, ApiError> {
    require_auth(&headers, &auth)?;
    Ok(Json(generate_capture(&mut rand::thread_rng(), Utc::now())))
}

#[utoipa::path(
    get,
    path = "/api/setup",
    responses(
        (status = 200, description = "Lab setup guide in markdown.", body = SetupGuide),
        (status = 401, description = "Missing or invalid bearer token.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "pcap"
)]
pub async fn setup(
    headers: HeaderMap,
    Extension(auth): Extension<Arc<AuthState>>,
) -> Result<Json<SetupGuide>, ApiError> {
    require_auth(&headers, &auth)?;
    Ok(Json(SetupGuide {
        content: SETUP_GUIDE.to_string(),
        format: "markdown".to_string(),
    }))
}
