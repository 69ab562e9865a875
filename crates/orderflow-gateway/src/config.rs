//! Gateway configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults where a default is safe. The secret key has no default.

use std::env;

use crate::error::{GatewayError, GatewayResult};

/// Default Stripe API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.stripe.com/v1";

/// Payment gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Secret API key used as the bearer token.
    pub secret_key: String,

    /// Base URL of the gateway REST API.
    /// Override for test servers and sandboxes.
    pub base_url: String,
}

impl GatewayConfig {
    /// Creates a configuration with an explicit secret key.
    pub fn new(secret_key: impl Into<String>) -> Self {
        GatewayConfig {
            secret_key: secret_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Overrides the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// ## Variables
    /// * `ORDERFLOW_GATEWAY_SECRET` - required, the gateway secret key
    /// * `ORDERFLOW_GATEWAY_URL` - optional, defaults to the Stripe API
    pub fn load() -> GatewayResult<Self> {
        let secret_key =
            env::var("ORDERFLOW_GATEWAY_SECRET").map_err(|_| GatewayError::MissingSecret)?;

        let base_url =
            env::var("ORDERFLOW_GATEWAY_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Ok(GatewayConfig {
            secret_key,
            base_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = GatewayConfig::new("sk_test_123").base_url("http://localhost:12111");
        assert_eq!(config.secret_key, "sk_test_123");
        assert_eq!(config.base_url, "http://localhost:12111");
    }
}
