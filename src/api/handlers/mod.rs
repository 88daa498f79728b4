//! Route handlers.
//!
//! Every `/api` handler except `register` and `login` starts with
//! [`require_auth`](crate::auth::require_auth) and works on the caller's id.

pub mod auth;
pub mod cves;
pub mod health;
pub mod logs;
pub mod payload;
pub mod pcap;
pub mod root;
pub mod scan;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ApiError;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

/// Resolve an optional `limit` query value against its default and maximum.
pub(crate) fn page_limit(limit: Option<u32>, default: u32, max: u32) -> Result<u32, ApiError> {
    match limit {
        None => Ok(default),
        Some(limit) if (1..=max).contains(&limit) => Ok(limit),
        Some(_) => Err(ApiError::Validation(format!(
            "limit must be between 1 and {max}"
        ))),
    }
}

#[cfg(test)]
mod limit_tests {
    use super::*;

    #[test]
    fn limit_defaults_and_bounds() {
        assert_eq!(page_limit(None, 50, 200), Ok(50));
        assert_eq!(page_limit(Some(200), 50, 200), Ok(200));
        assert!(page_limit(Some(201), 50, 200).is_err());
        assert!(page_limit(Some(0), 20, 100).is_err());
    }
}
