//! TOTP Secret Value Object
//!
//! Wraps a shared TOTP secret and the code verification around it.
//! Uses Google Authenticator compatible settings (SHA-1, 6 digits, 30s
//! step, ±1 step skew).

use kernel::error::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use totp_rs::{Algorithm, Secret, TOTP};

/// TOTP configuration constants
const TOTP_DIGITS: usize = 6;
const TOTP_STEP: u64 = 30;
const TOTP_SKEW: u8 = 1;

/// TOTP shared secret for two-factor authentication
///
/// The base32 form is returned to the client exactly once, in the
/// enrollment response; afterwards it lives only in storage.
#[derive(Clone, Serialize, Deserialize)]
pub struct TotpSecret {
    /// Base32-encoded secret
    secret_base32: String,
}

impl TotpSecret {
    /// Generate a new random TOTP secret
    pub fn generate() -> Self {
        let secret = Secret::generate_secret();
        Self {
            secret_base32: secret.to_encoded().to_string(),
        }
    }

    /// Create from a base32-encoded string (from storage or an enrollment
    /// completion request)
    pub fn from_base32(secret: impl Into<String>) -> AppResult<Self> {
        let secret_str = secret.into();
        // Validate by trying to decode
        Secret::Encoded(secret_str.clone())
            .to_bytes()
            .map_err(|e| AppError::internal(format!("Invalid TOTP secret: {}", e)))?;

        Ok(Self {
            secret_base32: secret_str,
        })
    }

    /// Get the base32-encoded secret for storage
    pub fn as_base32(&self) -> &str {
        &self.secret_base32
    }

    /// Create a TOTP instance for this secret
    fn to_totp(&self, issuer: Option<&str>, account_label: &str) -> AppResult<TOTP> {
        let secret = Secret::Encoded(self.secret_base32.clone());

        TOTP::new(
            Algorithm::SHA1,
            TOTP_DIGITS,
            TOTP_SKEW,
            TOTP_STEP,
            secret
                .to_bytes()
                .map_err(|e| AppError::internal(format!("Invalid TOTP secret: {}", e)))?,
            issuer.map(str::to_string),
            account_label.to_string(),
        )
        .map_err(|e| AppError::internal(format!("Failed to create TOTP: {}", e)))
    }

    /// Verify a submitted code against this secret.
    ///
    /// Allows the standard ±1 step clock-skew tolerance. Any internal
    /// failure (malformed secret, clock error) resolves to `false`; this
    /// never propagates a fault to the login path.
    pub fn verify(&self, code: &str) -> bool {
        match self.to_totp(None, "account") {
            Ok(totp) => totp.check_current(code).unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Verify a code against an explicit Unix timestamp
    #[cfg(test)]
    pub fn verify_at(&self, code: &str, time: u64) -> bool {
        match self.to_totp(None, "account") {
            Ok(totp) => totp.check(code, time),
            Err(_) => false,
        }
    }

    /// Generate the code for an explicit Unix timestamp
    #[cfg(test)]
    pub fn generate_at(&self, time: u64) -> String {
        self.to_totp(None, "account")
            .expect("test secret is valid")
            .generate(time)
    }

    /// Generate the current code (for tests)
    #[cfg(test)]
    pub fn generate_current(&self) -> String {
        self.to_totp(None, "account")
            .expect("test secret is valid")
            .generate_current()
            .expect("system clock is sane")
    }

    /// Get the otpauth:// enrollment URI for manual entry and QR encoding
    pub fn otpauth_uri(&self, issuer: &str, account_label: &str) -> AppResult<String> {
        let totp = self.to_totp(Some(issuer), account_label)?;
        Ok(totp.get_url())
    }

    /// Render the enrollment URI as a base64-encoded QR PNG.
    ///
    /// Returns `None` when rendering fails; enrollment then degrades to
    /// manual secret entry instead of failing outright.
    pub fn qr_png_base64(&self, issuer: &str, account_label: &str) -> Option<String> {
        let totp = self.to_totp(Some(issuer), account_label).ok()?;
        match totp.get_qr_base64() {
            Ok(png) => Some(png),
            Err(e) => {
                tracing::warn!(error = %e, "QR rendering failed, enrollment degrades to manual entry");
                None
            }
        }
    }
}

impl std::fmt::Debug for TotpSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TotpSecret(<redacted>)")
    }
}
