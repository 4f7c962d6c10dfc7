//! Second-Factor Configuration Entity
//!
//! A user's TOTP enrollment. Absent = 2FA disabled. Persisted only once
//! the user has proven possession of the secret by verifying a code; the
//! secret is never returned to a client after the initial enrollment
//! response.

use chrono::{DateTime, Utc};

use crate::domain::value_object::{totp_secret::TotpSecret, user_id::UserId};

/// Second-factor configuration
#[derive(Debug, Clone)]
pub struct SecondFactorConfig {
    pub user_id: UserId,
    /// Shared TOTP secret
    pub secret: TotpSecret,
    /// Whether the enrollment has been verified and is in force
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl SecondFactorConfig {
    /// Create a configuration for an enrollment the user just verified.
    ///
    /// Enrollment never persists an unverified secret, so a stored config
    /// starts out enabled.
    pub fn confirmed(user_id: UserId, secret: TotpSecret) -> Self {
        Self {
            user_id,
            secret,
            enabled: true,
            created_at: Utc::now(),
        }
    }

    /// Whether this configuration requires a second factor at login
    pub fn is_active(&self) -> bool {
        self.enabled
    }
}
