//! Verify Login Use Case
//!
//! Resolves a pending second-factor challenge: checks the submitted TOTP
//! code against the stored secret and, on success, issues a trust token
//! for the device. A wrong code leaves the challenge open for retry; the
//! only lockout is the throttle already applied at the password stage.

use std::sync::Arc;

use crate::application::ledger::DeviceTrustLedger;
use crate::domain::repository::{SecondFactorRepository, TrustedDeviceRepository};
use crate::domain::value_object::{trust_token::TrustToken, user_id::UserId};
use crate::error::{TwoFactorError, TwoFactorResult};

/// Verify login use case
pub struct VerifyLoginUseCase<F, D>
where
    F: SecondFactorRepository,
    D: TrustedDeviceRepository,
{
    config_repo: Arc<F>,
    ledger: DeviceTrustLedger<D>,
}

impl<F, D> VerifyLoginUseCase<F, D>
where
    F: SecondFactorRepository,
    D: TrustedDeviceRepository,
{
    pub fn new(config_repo: Arc<F>, device_repo: Arc<D>) -> Self {
        Self {
            config_repo,
            ledger: DeviceTrustLedger::new(device_repo),
        }
    }

    /// Verify the challenge code and trust the device.
    ///
    /// `ConfigurationMissing` when the user has no active enrollment; the
    /// user must re-enroll rather than retry.
    pub async fn execute(
        &self,
        user_id: &UserId,
        code: &str,
        user_agent: &str,
    ) -> TwoFactorResult<TrustToken> {
        let config = self
            .config_repo
            .find_config(user_id)
            .await?
            .filter(|c| c.is_active())
            .ok_or(TwoFactorError::ConfigurationMissing)?;

        if !config.secret.verify(code) {
            return Err(TwoFactorError::InvalidCode);
        }

        let token = self.ledger.issue(user_id, user_agent).await;

        tracing::info!(user_id = %user_id, "Second factor verified");

        Ok(token)
    }
}
