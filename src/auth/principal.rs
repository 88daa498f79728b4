//! Authenticated principal extraction.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use tracing::debug;

use super::AuthState;
use crate::api::ApiError;

/// Authenticated user context derived from the bearer token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Resolve the `Authorization` header into a principal, or return 401.
///
/// # Errors
/// Returns [`ApiError::Unauthorized`] when the header is missing, is not a
/// bearer token, or the token fails verification.
pub fn require_auth(headers: &HeaderMap, auth: &AuthState) -> Result<Principal, ApiError> {
    let Some(token) = bearer_token(headers) else {
        return Err(ApiError::Unauthorized("Not authenticated".to_string()));
    };

    match auth.keys().verify(token) {
        Ok(claims) => Ok(Principal {
            user_id: claims.sub,
        }),
        Err(err) => {
            debug!("Rejected bearer token: {err}");
            Err(ApiError::Unauthorized(
                "Could not validate credentials".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthConfig;
    use axum::http::HeaderValue;

    fn state() -> AuthState {
        AuthState::new(AuthConfig::new(b"secret"))
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    #[test]
    fn valid_bearer_token() {
        let state = state();
        let token = state.keys().issue("user-1").unwrap_or_default();
        let principal = require_auth(&headers(&format!("Bearer {token}")), &state);
        assert_eq!(
            principal.ok(),
            Some(Principal {
                user_id: "user-1".to_string()
            })
        );
    }

    #[test]
    fn missing_or_wrong_scheme_is_unauthorized() {
        let state = state();
        assert!(matches!(
            require_auth(&HeaderMap::new(), &state),
            Err(ApiError::Unauthorized(_))
        ));
        let token = state.keys().issue("user-1").unwrap_or_default();
        assert!(matches!(
            require_auth(&headers(&format!("Basic {token}")), &state),
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(
            require_auth(&headers("Bearer garbage"), &state),
            Err(ApiError::Unauthorized(_))
        ));
    }
}
