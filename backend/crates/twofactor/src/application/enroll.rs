//! Enrollment Use Case
//!
//! Two-step TOTP enrollment. `setup` generates a secret and enrollment
//! URI and hands them to the caller without persisting anything; only the
//! subsequent `verify` with a valid code stores the configuration and
//! issues an initial trust token, so the enrolling device is not
//! immediately re-challenged.

use std::sync::Arc;

use crate::application::config::TwoFactorConfig;
use crate::application::ledger::DeviceTrustLedger;
use crate::domain::entity::second_factor::SecondFactorConfig;
use crate::domain::repository::{SecondFactorRepository, TrustedDeviceRepository};
use crate::domain::value_object::{
    totp_secret::TotpSecret, trust_token::TrustToken, user_id::UserId,
};
use crate::error::{TwoFactorError, TwoFactorResult};

/// Enrollment setup output
pub struct EnrollSetupOutput {
    /// Secret for manual entry; returned to the client exactly once
    pub secret: String,
    /// otpauth:// URI
    pub otpauth_uri: String,
    /// QR code as base64-encoded PNG; absent when rendering failed
    pub qr_png_base64: Option<String>,
}

/// Enrollment use case
pub struct EnrollUseCase<F, D>
where
    F: SecondFactorRepository,
    D: TrustedDeviceRepository,
{
    config_repo: Arc<F>,
    ledger: DeviceTrustLedger<D>,
    config: Arc<TwoFactorConfig>,
}

impl<F, D> EnrollUseCase<F, D>
where
    F: SecondFactorRepository,
    D: TrustedDeviceRepository,
{
    pub fn new(config_repo: Arc<F>, device_repo: Arc<D>, config: Arc<TwoFactorConfig>) -> Self {
        Self {
            config_repo,
            ledger: DeviceTrustLedger::new(device_repo),
            config,
        }
    }

    /// Start enrollment: generate a secret and its enrollment encodings.
    ///
    /// Nothing is persisted here. A QR rendering failure degrades to
    /// manual secret entry rather than failing the enrollment.
    pub fn setup(&self, user_id: &UserId, account_label: &str) -> TwoFactorResult<EnrollSetupOutput> {
        let secret = TotpSecret::generate();

        let otpauth_uri = secret
            .otpauth_uri(&self.config.issuer, account_label)
            .map_err(|e| TwoFactorError::Internal(e.to_string()))?;

        let qr_png_base64 = secret.qr_png_base64(&self.config.issuer, account_label);

        tracing::info!(user_id = %user_id, "Enrollment started");

        Ok(EnrollSetupOutput {
            secret: secret.as_base32().to_string(),
            otpauth_uri,
            qr_png_base64,
        })
    }

    /// Complete enrollment: verify possession of the secret, persist the
    /// configuration, and trust the enrolling device.
    ///
    /// Returns the raw trust token for the cookie. A malformed secret or
    /// wrong code is an `InvalidCode`, never a fault.
    pub async fn verify(
        &self,
        user_id: &UserId,
        secret_base32: &str,
        code: &str,
        user_agent: &str,
    ) -> TwoFactorResult<TrustToken> {
        let secret =
            TotpSecret::from_base32(secret_base32).map_err(|_| TwoFactorError::InvalidCode)?;

        if !secret.verify(code) {
            return Err(TwoFactorError::InvalidCode);
        }

        // Concurrent enrollments by the same user race; last verify wins
        let config = SecondFactorConfig::confirmed(*user_id, secret);
        self.config_repo.save_config(&config).await?;

        let token = self.ledger.issue(user_id, user_agent).await;

        tracing::info!(user_id = %user_id, "Second factor enabled");

        Ok(token)
    }
}
