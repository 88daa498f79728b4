//! Tool history endpoints. A log is only visible to the user that created it.

use axum::{
    extract::{rejection::QueryRejection, Extension, Path, Query},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use utoipa::IntoParams;

use super::{page_limit, MessageResponse};
use crate::{
    api::{error::ErrorBody, ApiError},
    auth::{require_auth, AuthState},
    db::{LogEntry, LogQuery, Store},
};

pub const DEFAULT_LOG_LIMIT: u32 = 50;
pub const MAX_LOG_LIMIT: u32 = 200;

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct LogsParams {
    /// Page size, 1 to 200 (default 50).
    pub limit: Option<u32>,
    /// Number of entries to skip (default 0).
    pub offset: Option<u64>,
    /// Only return entries recorded by this tool (`scan` or `payload`).
    pub tool: Option<String>,
}

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct PagingParams {
    /// Page size, 1 to 200 (default 50).
    pub limit: Option<u32>,
    /// Number of entries to skip (default 0).
    pub offset: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/api/logs",
    params(LogsParams),
    responses(
        (status = 200, description = "Caller's logs, newest first.", body = [LogEntry]),
        (status = 401, description = "Missing or invalid bearer token.", body = ErrorBody),
        (status = 422, description = "Invalid paging parameters.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "logs"
)]
pub async fn list_logs(
    headers: HeaderMap,
    Extension(store): Extension<Arc<dyn Store>>,
    Extension(auth): Extension<Arc<AuthState>>,
    params: Result<Query<LogsParams>, QueryRejection>,
) -> Result<Json<Vec<LogEntry>>, ApiError> {
    let principal = require_auth(&headers, &auth)?;
    let Query(params) = params?;

    let query = LogQuery {
        user_id: principal.user_id,
        tool: params.tool.filter(|tool| !tool.is_empty()),
        limit: page_limit(params.limit, DEFAULT_LOG_LIMIT, MAX_LOG_LIMIT)?,
        offset: params.offset.unwrap_or(0),
    };

    let logs = store.list_logs(&query).await?;
    debug!(count = logs.len(), "Listed logs");

    Ok(Json(logs))
}

#[utoipa::path(
    get,
    path = "/api/user-logs/{id}",
    params(
        ("id" = String, Path, description = "User id, must be the caller"),
        PagingParams
    ),
    responses(
        (status = 200, description = "User's logs, newest first.", body = [LogEntry]),
        (status = 401, description = "Missing or invalid bearer token.", body = ErrorBody),
        (status = 403, description = "Requested another user's logs.", body = ErrorBody),
        (status = 422, description = "Invalid paging parameters.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "logs"
)]
pub async fn user_logs(
    headers: HeaderMap,
    Path(id): Path<String>,
    Extension(store): Extension<Arc<dyn Store>>,
    Extension(auth): Extension<Arc<AuthState>>,
    params: Result<Query<PagingParams>, QueryRejection>,
) -> Result<Json<Vec<LogEntry>>, ApiError> {
    let principal = require_auth(&headers, &auth)?;

    if principal.user_id != id {
        debug!("Denied access to another user's logs");
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }

    let Query(params) = params?;

    let query = LogQuery {
        user_id: id,
        tool: None,
        limit: page_limit(params.limit, DEFAULT_LOG_LIMIT, MAX_LOG_LIMIT)?,
        offset: params.offset.unwrap_or(0),
    };

    Ok(Json(store.list_logs(&query).await?))
}

#[utoipa::path(
    delete,
    path = "/api/logs/{id}",
    params(("id" = String, Path, description = "Log id")),
    responses(
        (status = 200, description = "Log deleted.", body = MessageResponse),
        (status = 401, description = "Missing or invalid bearer token.", body = ErrorBody),
        (status = 404, description = "No such log owned by the caller.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "logs"
)]
pub async fn delete_log(
    headers: HeaderMap,
    Path(id): Path<String>,
    Extension(store): Extension<Arc<dyn Store>>,
    Extension(auth): Extension<Arc<AuthState>>,
) -> Result<Json<MessageResponse>, ApiError> {
    let principal = require_auth(&headers, &auth)?;

    if !store.delete_log(&principal.user_id, &id).await? {
        return Err(ApiError::NotFound("Log not found".to_string()));
    }

    debug!(log_id = %id, "Log deleted");

    Ok(Json(MessageResponse {
        message: "Log deleted successfully".to_string(),
    }))
}
