//! Application Configuration
//!
//! Configuration for the two-factor application layer.

use std::time::Duration;

use platform::rate_limit::RateLimitConfig;

/// Re-export SameSite from platform
pub use platform::cookie::SameSite;

/// Two-factor application configuration
#[derive(Debug, Clone)]
pub struct TwoFactorConfig {
    /// Issuer name shown in authenticator apps
    pub issuer: String,
    /// Device-trust cookie name
    pub trust_cookie_name: String,
    /// Device-trust lifetime (one year)
    pub trust_ttl: Duration,
    /// Whether to require Secure cookie
    pub cookie_secure: bool,
    /// SameSite policy
    pub cookie_same_site: SameSite,
    /// Per-account login window (tight limit, long window)
    pub account_limit: RateLimitConfig,
    /// Per-origin login window (high ceiling, longer window)
    pub origin_limit: RateLimitConfig,
}

impl Default for TwoFactorConfig {
    fn default() -> Self {
        Self {
            issuer: "Driftwood".to_string(),
            trust_cookie_name: "dw_trusted_device".to_string(),
            trust_ttl: Duration::from_secs(365 * 24 * 3600),
            cookie_secure: true,
            cookie_same_site: SameSite::Lax,
            account_limit: RateLimitConfig::new(5, 15 * 60),
            origin_limit: RateLimitConfig::new(200, 60 * 60),
        }
    }
}

impl TwoFactorConfig {
    /// Create config for development (insecure cookie)
    pub fn development() -> Self {
        Self {
            cookie_secure: false,
            ..Default::default()
        }
    }

    /// Trust cookie Max-Age in seconds
    pub fn trust_ttl_secs(&self) -> i64 {
        self.trust_ttl.as_secs() as i64
    }
}
