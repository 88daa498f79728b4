use crate::{api::handlers::root, auth::AuthState, db::Store};
use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::{get, options},
    Extension, Json, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;
use utoipa_axum::router::OpenApiRouter;

mod error;
pub mod handlers;
// OpenAPI router wiring and route registration live in openapi.rs.
mod openapi;

pub use error::{ApiError, ErrorBody};
pub use openapi::openapi;

pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// Build the API router with all documented routes registered.
#[must_use]
pub fn router() -> OpenApiRouter {
    openapi::api_router()
}

/// Assemble the full application: documented routes, `/`, the `OpenAPI`
/// document and the middleware stack.
pub fn app(store: Arc<dyn Store>, auth_state: Arc<AuthState>, cors: CorsLayer) -> Router {
    // Build the router from OpenAPI-wired routes, then extend it with non-doc routes like `/` and
    // preflight-only `OPTIONS /health`.
    let (router, openapi) = router().split_for_parts();

    router
        .route("/", get(root::root))
        .route("/health", options(handlers::health::health))
        .route(
            OPENAPI_PATH,
            get(move || {
                let doc = openapi.clone();
                async move { Json(doc) }
            }),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(auth_state))
                .layer(Extension(store)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to bind or serve
pub async fn new(
    port: u16,
    store: Arc<dyn Store>,
    auth_state: Arc<AuthState>,
    cors: CorsLayer,
) -> Result<()> {
    let app = app(store, auth_state, cors);

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

/// Cross-origin policy. `*` (or no origins) allows any origin without
/// credentials; otherwise only the listed origins are allowed.
///
/// # Errors
/// Returns an error if an origin is not an absolute http(s) URL.
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|origin| origin.trim() == "*") {
        return Ok(base.allow_origin(Any));
    }

    let allowed = origins
        .iter()
        .map(|origin| origin_header(origin))
        .collect::<Result<Vec<_>>>()?;

    Ok(base.allow_origin(AllowOrigin::list(allowed)))
}

fn origin_header(origin: &str) -> Result<HeaderValue> {
    let parsed =
        Url::parse(origin.trim()).with_context(|| format!("Invalid CORS origin: {origin}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(anyhow!("CORS origin must use http or https: {origin}"));
    }
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("CORS origin must include a valid host: {origin}"))?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build CORS origin header")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_header_strips_path() -> Result<()> {
        assert_eq!(
            origin_header("https://redrecon.vercel.app/dashboard")?,
            HeaderValue::from_static("https://redrecon.vercel.app")
        );
        assert_eq!(
            origin_header(" http://localhost:3000 ")?,
            HeaderValue::from_static("http://localhost:3000")
        );
        Ok(())
    }

    #[test]
    fn origin_header_rejects_garbage() {
        assert!(origin_header("localhost:3000").is_err());
        assert!(origin_header("ftp://example.com").is_err());
        assert!(origin_header("not a url").is_err());
    }

    #[test]
    fn cors_layer_accepts_wildcard_and_lists() {
        assert!(cors_layer(&["*".to_string()]).is_ok());
        assert!(cors_layer(&[]).is_ok());
        assert!(cors_layer(&[
            "http://localhost:3000".to_string(),
            "https://redrecon.vercel.app".to_string()
        ])
        .is_ok());
        assert!(cors_layer(&["nope".to_string()]).is_err());
    }
}
