//! Auth state and configuration.

use super::token::TokenKeys;

const DEFAULT_TOKEN_TTL_SECONDS: i64 = 30 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    keys: TokenKeys,
    bcrypt_cost: u32,
}

impl AuthConfig {
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        Self {
            keys: TokenKeys::new(secret, DEFAULT_TOKEN_TTL_SECONDS),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }

    #[must_use]
    pub fn with_token_ttl_minutes(mut self, minutes: u64) -> Self {
        let seconds = i64::try_from(minutes.saturating_mul(60)).unwrap_or(i64::MAX);
        self.keys = self.keys.with_ttl_seconds(seconds);
        self
    }

    #[must_use]
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    #[must_use]
    pub fn keys(&self) -> &TokenKeys {
        &self.keys
    }

    #[must_use]
    pub fn bcrypt_cost(&self) -> u32 {
        self.bcrypt_cost
    }
}

/// Shared by every handler through an `Extension`.
#[derive(Debug)]
pub struct AuthState {
    config: AuthConfig,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn keys(&self) -> &TokenKeys {
        self.config.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = AuthConfig::new(b"secret");
        assert_eq!(config.bcrypt_cost(), bcrypt::DEFAULT_COST);
        assert_eq!(config.keys().ttl_seconds(), DEFAULT_TOKEN_TTL_SECONDS);

        let config = config.with_token_ttl_minutes(5).with_bcrypt_cost(4);
        assert_eq!(config.bcrypt_cost(), 4);
        assert_eq!(config.keys().ttl_seconds(), 300);
    }

    #[test]
    fn huge_ttl_saturates() {
        let config = AuthConfig::new(b"secret").with_token_ttl_minutes(u64::MAX);
        assert_eq!(config.keys().ttl_seconds(), i64::MAX);
    }
}
