use crate::{
    api::{app, cors_layer, OPENAPI_PATH},
    auth::{AuthConfig, AuthState},
    db::{Cve, CveFilter, LogEntry, LogQuery, MemoryStore, Store, StoreError, StoreResult, User},
};
use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE},
        Request, StatusCode,
    },
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct Reply {
    status: StatusCode,
    headers: axum::http::HeaderMap,
    body: Value,
}

fn test_app() -> Result<Router> {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::default());
    let auth = Arc::new(AuthState::new(
        AuthConfig::new(b"router-test-secret").with_bcrypt_cost(4),
    ));
    Ok(app(store, auth, cors_layer(&["*".to_string()])?))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Result<Reply> {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?,
        None => request.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    Ok(Reply {
        status,
        headers,
        body,
    })
}

/// A store whose backend is never reachable.
struct UnavailableStore;

fn down<T>() -> StoreResult<T> {
    Err(StoreError::Unavailable("connection refused".to_string()))
}

#[async_trait::async_trait]
impl Store for UnavailableStore {
    fn kind(&self) -> &'static str {
        "mongodb"
    }

    async fn ping(&self) -> StoreResult<()> {
        down()
    }

    async fn find_user_by_email(&self, _email: &str) -> StoreResult<Option<User>> {
        down()
    }

    async fn find_user_by_id(&self, _id: &str) -> StoreResult<Option<User>> {
        down()
    }

    async fn insert_user(&self, _user: &User) -> StoreResult<()> {
        down()
    }

    async fn insert_log(&self, _entry: &LogEntry) -> StoreResult<()> {
        down()
    }

    async fn list_logs(&self, _query: &LogQuery) -> StoreResult<Vec<LogEntry>> {
        down()
    }

    async fn delete_log(&self, _user_id: &str, _log_id: &str) -> StoreResult<bool> {
        down()
    }

    async fn count_cves(&self) -> StoreResult<u64> {
        down()
    }

    async fn insert_cve(&self, _cve: &Cve) -> StoreResult<()> {
        down()
    }

    async fn list_cves(&self, _filter: &CveFilter) -> StoreResult<Vec<Cve>> {
        down()
    }

    async fn find_cve(&self, _id: &str) -> StoreResult<Option<Cve>> {
        down()
    }

    async fn search_cves(&self, _term: &str, _limit: u32) -> StoreResult<Vec<Cve>> {
        down()
    }
}

/// Register and log in, returning `(token, user_id)`.
async fn signup(app: &Router, email: &str) -> Result<(String, String)> {
    let credentials = json!({"email": email, "password": "hunter22"});
    let reply = send(app, "POST", "/api/register", None, Some(credentials.clone())).await?;
    assert_eq!(reply.status, StatusCode::CREATED);

    let reply = send(app, "POST", "/api/login", None, Some(credentials)).await?;
    assert_eq!(reply.status, StatusCode::OK);

    let token = reply.body["access_token"].as_str().unwrap_or_default();
    let user_id = reply.body["user"]["id"].as_str().unwrap_or_default();
    Ok((token.to_string(), user_id.to_string()))
}

fn detail(reply: &Reply) -> &str {
    reply.body["detail"].as_str().unwrap_or_default()
}

#[tokio::test]
async fn register_login_and_me() -> Result<()> {
    let app = test_app()?;

    let reply = send(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({"email": "  Alice@Example.com ", "password": "hunter22"})),
    )
    .await?;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["email"], "alice@example.com");
    assert_eq!(reply.body["message"], "User registered successfully");

    let reply = send(
        &app,
        "POST",
        "/api/login",
        None,
        Some(json!({"email": "alice@example.com", "password": "hunter22"})),
    )
    .await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["token_type"], "bearer");
    assert!(reply.body["user"].get("hashed_password").is_none());
    let token = reply.body["access_token"].as_str().unwrap_or_default().to_string();
    let user_id = reply.body["user"]["id"].clone();

    let reply = send(&app, "GET", "/api/me", Some(&token), None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["id"], user_id);
    assert_eq!(reply.body["email"], "alice@example.com");
    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_rejected() -> Result<()> {
    let app = test_app()?;
    signup(&app, "bob@example.com").await?;

    let reply = send(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({"email": "BOB@example.com", "password": "another1"})),
    )
    .await?;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(detail(&reply), "Email already registered");
    Ok(())
}

#[tokio::test]
async fn register_validates_input() -> Result<()> {
    let app = test_app()?;

    for body in [
        json!({"email": "not-an-email", "password": "hunter22"}),
        json!({"email": "carol@example.com", "password": "short"}),
        json!({"email": "carol@example.com"}),
    ] {
        let reply = send(&app, "POST", "/api/register", None, Some(body)).await?;
        assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(!detail(&reply).is_empty());
    }
    Ok(())
}

#[tokio::test]
async fn wrong_credentials_are_unauthorized() -> Result<()> {
    let app = test_app()?;
    signup(&app, "dave@example.com").await?;

    for body in [
        json!({"email": "dave@example.com", "password": "wrong-password"}),
        json!({"email": "nobody@example.com", "password": "hunter22"}),
    ] {
        let reply = send(&app, "POST", "/api/login", None, Some(body)).await?;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(detail(&reply), "Invalid email or password");
    }
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_token() -> Result<()> {
    let app = test_app()?;

    for (method, uri) in [
        ("GET", "/api/me"),
        ("GET", "/api/logs"),
        ("GET", "/api/cves"),
        ("GET", "/api/pcap"),
        ("GET", "/api/setup"),
        ("DELETE", "/api/logs/some-id"),
    ] {
        let reply = send(&app, method, uri, None, None).await?;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert!(reply.headers.contains_key(WWW_AUTHENTICATE));

        let reply = send(&app, method, uri, Some("garbage"), None).await?;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED, "{method} {uri}");
    }
    Ok(())
}

#[tokio::test]
async fn scan_is_recorded() -> Result<()> {
    let app = test_app()?;
    let (token, user_id) = signup(&app, "erin@example.com").await?;

    let reply = send(
        &app,
        "POST",
        "/api/scan",
        Some(&token),
        Some(json!({"target": "10.0.0.5"})),
    )
    .await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["target"], "10.0.0.5");
    assert_eq!(reply.body["status"], "completed");
    let ports = reply.body["ports"].as_array().map_or(0, Vec::len);
    assert!((3..=6).contains(&ports));

    let reply = send(&app, "GET", "/api/logs", Some(&token), None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    let logs = reply.body.as_array().cloned().unwrap_or_default();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["tool"], "scan");
    assert_eq!(logs[0]["input_data"], "10.0.0.5");
    assert_eq!(logs[0]["user_id"], Value::String(user_id));
    assert_eq!(logs[0]["result"]["target"], "10.0.0.5");

    for target in [String::new(), "a".repeat(256)] {
        let reply = send(
            &app,
            "POST",
            "/api/scan",
            Some(&token),
            Some(json!({ "target": target })),
        )
        .await?;
        assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    }
    Ok(())
}

#[tokio::test]
async fn payload_is_recorded() -> Result<()> {
    let app = test_app()?;
    let (token, _) = signup(&app, "frank@example.com").await?;

    let reply = send(
        &app,
        "POST",
        "/api/payload",
        Some(&token),
        Some(json!({
            "payload_type": "sqli",
            "target_url": "http://target.local/login",
            "payload": "' OR 1=1 --"
        })),
    )
    .await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["payload_type"], "sqli");
    assert_eq!(
        reply.body["success"],
        reply.body["response"]["vulnerability_detected"]
    );

    send(
        &app,
        "POST",
        "/api/scan",
        Some(&token),
        Some(json!({"target": "target.local"})),
    )
    .await?;

    let reply = send(&app, "GET", "/api/logs?tool=payload", Some(&token), None).await?;
    let logs = reply.body.as_array().cloned().unwrap_or_default();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["input_data"], "sqli: http://target.local/login");

    for body in [
        json!({"payload_type": "ssrf", "target_url": "http://t", "payload": "x"}),
        json!({"payload_type": "xss", "target_url": "", "payload": "x"}),
        json!({"payload_type": "xss", "target_url": "http://t", "payload": ""}),
    ] {
        let reply = send(&app, "POST", "/api/payload", Some(&token), Some(body)).await?;
        assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    }
    Ok(())
}

#[tokio::test]
async fn logs_are_owner_only() -> Result<()> {
    let app = test_app()?;
    let (alice, alice_id) = signup(&app, "alice@example.com").await?;
    let (bob, _) = signup(&app, "bob@example.com").await?;

    send(
        &app,
        "POST",
        "/api/scan",
        Some(&alice),
        Some(json!({"target": "192.168.1.10"})),
    )
    .await?;

    let reply = send(&app, "GET", "/api/logs", Some(&alice), None).await?;
    let log_id = reply.body[0]["id"].as_str().unwrap_or_default().to_string();
    assert!(!log_id.is_empty());

    let reply = send(&app, "GET", "/api/logs", Some(&bob), None).await?;
    assert_eq!(reply.body.as_array().map(Vec::len), Some(0));

    let uri = format!("/api/user-logs/{alice_id}");
    let reply = send(&app, "GET", &uri, Some(&bob), None).await?;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(detail(&reply), "Access denied");

    let reply = send(&app, "GET", &uri, Some(&alice), None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body.as_array().map(Vec::len), Some(1));

    let uri = format!("/api/logs/{log_id}");
    let reply = send(&app, "DELETE", &uri, Some(&bob), None).await?;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(detail(&reply), "Log not found");

    let reply = send(&app, "DELETE", &uri, Some(&alice), None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["message"], "Log deleted successfully");

    let reply = send(&app, "DELETE", &uri, Some(&alice), None).await?;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn paging_limits_are_enforced() -> Result<()> {
    let app = test_app()?;
    let (token, user_id) = signup(&app, "gina@example.com").await?;

    for uri in [
        "/api/logs?limit=201".to_string(),
        "/api/logs?offset=-1".to_string(),
        "/api/logs?limit=abc".to_string(),
        format!("/api/user-logs/{user_id}?limit=500"),
        "/api/cves?limit=101".to_string(),
        "/api/cves/search/apache?limit=101".to_string(),
    ] {
        let reply = send(&app, "GET", &uri, Some(&token), None).await?;
        assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY, "{uri}");
    }

    let reply = send(&app, "GET", "/api/logs?limit=200&offset=0", Some(&token), None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn cve_catalogue_filters_and_search() -> Result<()> {
    let app = test_app()?;
    let (token, _) = signup(&app, "hank@example.com").await?;

    let count = |reply: &Reply| reply.body.as_array().map_or(0, Vec::len);

    let reply = send(&app, "GET", "/api/cves", Some(&token), None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(count(&reply), 5);

    let reply = send(&app, "GET", "/api/cves?severity=critical", Some(&token), None).await?;
    assert_eq!(count(&reply), 2);

    let reply = send(&app, "GET", "/api/cves?tag=sqli", Some(&token), None).await?;
    assert_eq!(count(&reply), 1);
    assert_eq!(reply.body[0]["id"], "CVE-2024-5678");

    let reply = send(&app, "GET", "/api/cves?severity=low", Some(&token), None).await?;
    assert_eq!(count(&reply), 0);

    let reply = send(&app, "GET", "/api/cves?limit=3", Some(&token), None).await?;
    assert_eq!(count(&reply), 3);

    let reply = send(&app, "GET", "/api/cves/CVE-2024-1234", Some(&token), None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["severity"], "critical");

    let reply = send(&app, "GET", "/api/cves/CVE-1999-0001", Some(&token), None).await?;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(detail(&reply), "CVE not found");

    let reply = send(&app, "GET", "/api/cves/search/APACHE", Some(&token), None).await?;
    assert_eq!(count(&reply), 1);

    let reply = send(&app, "GET", "/api/cves/search/(XSS)", Some(&token), None).await?;
    assert_eq!(count(&reply), 1);
    assert_eq!(reply.body[0]["id"], "CVE-2024-9876");

    let reply = send(&app, "GET", "/api/cves/search/cryptography", Some(&token), None).await?;
    assert_eq!(count(&reply), 1);
    assert_eq!(reply.body[0]["id"], "CVE-2024-8765");
    Ok(())
}

#[tokio::test]
async fn cve_lookup_seeds_an_empty_catalogue() -> Result<()> {
    let app = test_app()?;
    let (token, _) = signup(&app, "ivy@example.com").await?;

    let reply = send(&app, "GET", "/api/cves/CVE-2024-4321", Some(&token), None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["tags"], json!(["privilege-escalation", "linux", "kernel"]));
    Ok(())
}

#[tokio::test]
async fn pcap_and_setup() -> Result<()> {
    let app = test_app()?;
    let (token, _) = signup(&app, "jack@example.com").await?;

    let reply = send(&app, "GET", "/api/pcap", Some(&token), None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    let filename = reply.body["filename"].as_str().unwrap_or_default();
    assert!(filename.starts_with("capture_") && filename.ends_with(".pcap"));

    let reply = send(&app, "GET", "/api/setup", Some(&token), None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["format"], "markdown");
    assert!(reply.body["content"]
        .as_str()
        .is_some_and(|content| content.contains("Lab Setup Guide")));
    Ok(())
}

#[tokio::test]
async fn root_health_and_openapi() -> Result<()> {
    let app = test_app()?;

    let reply = send(&app, "GET", "/", None, None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["message"], "RedRecon API is running");
    assert!(reply.headers.contains_key("x-request-id"));

    let reply = send(&app, "GET", "/health", None, None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["database"], "ok");
    assert_eq!(reply.body["storage"], "memory");
    assert!(reply.headers.contains_key("X-App"));

    let reply = send(&app, "GET", OPENAPI_PATH, None, None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body["paths"].get("/api/cves/search/{term}").is_some());
    Ok(())
}

#[tokio::test]
async fn database_outage_returns_service_unavailable() -> Result<()> {
    let store: Arc<dyn Store> = Arc::new(UnavailableStore);
    let auth = Arc::new(AuthState::new(
        AuthConfig::new(b"router-test-secret").with_bcrypt_cost(4),
    ));
    let token = auth.keys().issue("user-1")?;
    let app = app(store, auth, cors_layer(&["*".to_string()])?);

    let reply = send(&app, "GET", "/health", None, None).await?;
    assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(reply.body["database"], "error");
    assert_eq!(reply.body["storage"], "mongodb");
    assert!(reply.headers.contains_key("x-app"));

    let reply = send(&app, "GET", "/api/logs", Some(&token), None).await?;
    assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(detail(&reply), "Database service unavailable");

    let credentials = json!({"email": "down@example.com", "password": "hunter22"});
    let reply = send(&app, "POST", "/api/login", None, Some(credentials)).await?;
    assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}
