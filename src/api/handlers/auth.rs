//! Account endpoints.
//!
//! Flow Overview:
//! 1) `register` normalizes and validates the email, rejects duplicates and
//!    stores a bcrypt hash of the password.
//! 2) `login` verifies the password and issues a bearer token.
//! 3) `me` resolves the token back to the stored user.

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

use crate::{
    api::{error::ErrorBody, ApiError},
    auth::{
        hash_password, normalize_email, require_auth, valid_email, verify_password, AuthState,
        MIN_PASSWORD_LENGTH,
    },
    db::{Store, StoreError, User},
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const EMAIL_TAKEN: &str = "Email already registered";

#[derive(ToSchema, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterResponse {
    pub message: String,
    pub email: String,
}

#[derive(ToSchema, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public projection of a user, never carries the password hash.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserResponse,
}

#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered.", body = RegisterResponse),
        (status = 400, description = "Email already registered.", body = ErrorBody),
        (status = 422, description = "Invalid email or password too short.", body = ErrorBody),
        (status = 503, description = "Database unavailable.", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn register(
    Extension(store): Extension<Arc<dyn Store>>,
    Extension(auth): Extension<Arc<AuthState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(ApiError::Validation("Invalid email address".to_string()));
    }
    if request.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    if store.find_user_by_email(&email).await?.is_some() {
        debug!("Registration rejected, email already exists");
        return Err(ApiError::BadRequest(EMAIL_TAKEN.to_string()));
    }

    let hashed_password = hash_password(request.password, auth.config().bcrypt_cost())
        .await
        .map_err(|err| {
            error!("Failed to hash password: {err:#}");
            ApiError::Internal("Internal server error".to_string())
        })?;

    let user = User::new(email, hashed_password);
    match store.insert_user(&user).await {
        Ok(()) => {}
        // Lost a race with a concurrent registration for the same email.
        Err(StoreError::Duplicate) => return Err(ApiError::BadRequest(EMAIL_TAKEN.to_string())),
        Err(err) => return Err(err.into()),
    }

    debug!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            email: user.email,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Bearer token issued.", body = TokenResponse),
        (status = 401, description = "Invalid email or password.", body = ErrorBody),
        (status = 503, description = "Database unavailable.", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    Extension(store): Extension<Arc<dyn Store>>,
    Extension(auth): Extension<Arc<AuthState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(request) = payload?;
    let email = normalize_email(&request.email);

    let Some(user) = store.find_user_by_email(&email).await? else {
        debug!("Login rejected, unknown email");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    if !verify_password(request.password, user.hashed_password.clone()).await {
        debug!(user_id = %user.id, "Login rejected, wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let access_token = auth.keys().issue(&user.id).map_err(|err| {
        error!("Failed to issue token: {err}");
        ApiError::Internal("Internal server error".to_string())
    })?;

    debug!(user_id = %user.id, "User logged in");

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
        user: user.into(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current user.", body = UserResponse),
        (status = 401, description = "Missing or invalid bearer token.", body = ErrorBody),
        (status = 404, description = "User not found.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn me(
    headers: HeaderMap,
    Extension(store): Extension<Arc<dyn Store>>,
    Extension(auth): Extension<Arc<AuthState>>,
) -> Result<Json<UserResponse>, ApiError> {
    let principal = require_auth(&headers, &auth)?;

    store
        .find_user_by_id(&principal.user_id)
        .await?
        .map(|user| Json(user.into()))
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}
