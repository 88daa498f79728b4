//! CVE catalogue lookups. The catalogue is seeded with sample entries the
//! first time it is read while empty.

use axum::{
    extract::{rejection::QueryRejection, Extension, Path, Query},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};
use utoipa::IntoParams;

use super::page_limit;
use crate::{
    api::{error::ErrorBody, ApiError},
    auth::{require_auth, AuthState},
    db::{Cve, CveFilter, Store, StoreError},
    simulate::sample_cves,
};

pub const DEFAULT_CVE_LIMIT: u32 = 20;
pub const MAX_CVE_LIMIT: u32 = 100;

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct CveParams {
    /// Exact severity (`critical`, `high`, `medium`, `low`).
    pub severity: Option<String>,
    /// Only CVEs carrying this tag.
    pub tag: Option<String>,
    /// Page size, 1 to 100 (default 20).
    pub limit: Option<u32>,
}

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Page size, 1 to 100 (default 20).
    pub limit: Option<u32>,
}

/// Insert the sample catalogue when the collection is empty. Entries inserted
/// concurrently by another request are skipped.
async fn ensure_seeded(store: &dyn Store) -> Result<(), ApiError> {
    if store.count_cves().await? > 0 {
        return Ok(());
    }

    for cve in sample_cves() {
        match store.insert_cve(&cve).await {
            Ok(()) | Err(StoreError::Duplicate) => {}
            Err(err) => return Err(err.into()),
        }
    }

    info!("Seeded CVE catalogue with sample entries");
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

#[utoipa::path(
    get,
    path = "/api/cves",
    params(CveParams),
    responses(
        (status = 200, description = "Matching CVEs.", body = [Cve]),
        (status = 401, description = "Missing or invalid bearer token.", body = ErrorBody),
        (status = 422, description = "Invalid limit.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "cves"
)]
pub async fn list_cves(
    headers: HeaderMap,
    Extension(store): Extension<Arc<dyn Store>>,
    Extension(auth): Extension<Arc<AuthState>>,
    params: Result<Query<CveParams>, QueryRejection>,
) -> Result<Json<Vec<Cve>>, ApiError> {
    require_auth(&headers, &auth)?;
    let Query(params) = params?;

    let filter = CveFilter {
        severity: non_empty(params.severity),
        tag: non_empty(params.tag),
        limit: page_limit(params.limit, DEFAULT_CVE_LIMIT, MAX_CVE_LIMIT)?,
    };

    ensure_seeded(store.as_ref()).await?;

    let cves = store.list_cves(&filter).await?;
    debug!(count = cves.len(), "Listed CVEs");

    Ok(Json(cves))
}

#[utoipa::path(
    get,
    path = "/api/cves/{id}",
    params(("id" = String, Path, description = "CVE identifier, e.g. CVE-2024-1234")),
    responses(
        (status = 200, description = "The CVE.", body = Cve),
        (status = 401, description = "Missing or invalid bearer token.", body = ErrorBody),
        (status = 404, description = "CVE not found.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "cves"
)]
pub async fn get_cve(
    headers: HeaderMap,
    Path(id): Path<String>,
    Extension(store): Extension<Arc<dyn Store>>,
    Extension(auth): Extension<Arc<AuthState>>,
) -> Result<Json<Cve>, ApiError> {
    require_auth(&headers, &auth)?;
    ensure_seeded(store.as_ref()).await?;

    store
        .find_cve(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("CVE not found".to_string()))
}

#[utoipa::path(
    get,
    path = "/api/cves/search/{term}",
    params(
        ("term" = String, Path, description = "Matched against descriptions (case-insensitive) and tags"),
        SearchParams
    ),
    responses(
        (status = 200, description = "Matching CVEs.", body = [Cve]),
        (status = 401, description = "Missing or invalid bearer token.", body = ErrorBody),
        (status = 422, description = "Invalid limit.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "cves"
)]
pub async fn search_cves(
    headers: HeaderMap,
    Path(term): Path<String>,
    Extension(store): Extension<Arc<dyn Store>>,
    Extension(auth): Extension<Arc<AuthState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<Cve>>, ApiError> {
    require_auth(&headers, &auth)?;
    let Query(params) = params?;
    let limit = page_limit(params.limit, DEFAULT_CVE_LIMIT, MAX_CVE_LIMIT)?;

    ensure_seeded(store.as_ref()).await?;

    let cves = store.search_cves(&term, limit).await?;
    debug!(count = cves.len(), "Searched CVEs");

    Ok(Json(cves))
}
