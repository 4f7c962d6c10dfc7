//! Disable Use Case
//!
//! Turns 2FA off for a user. Device trust was predicated on 2FA having
//! been satisfied at least once, so every trusted device is revoked
//! alongside the configuration. Revocation runs first: if it fails, the
//! configuration stays in force.

use std::sync::Arc;

use crate::application::ledger::DeviceTrustLedger;
use crate::domain::repository::{SecondFactorRepository, TrustedDeviceRepository};
use crate::domain::value_object::user_id::UserId;
use crate::error::TwoFactorResult;

/// Disable use case
pub struct DisableUseCase<F, D>
where
    F: SecondFactorRepository,
    D: TrustedDeviceRepository,
{
    config_repo: Arc<F>,
    ledger: DeviceTrustLedger<D>,
}

impl<F, D> DisableUseCase<F, D>
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

    /// Disable 2FA and revoke all standing device trust, unconditionally.
    pub async fn execute(&self, user_id: &UserId) -> TwoFactorResult<()> {
        let revoked = self.ledger.revoke(user_id, None).await?;
        self.config_repo.clear_config(user_id).await?;

        tracing::info!(user_id = %user_id, revoked, "Second factor disabled");

        Ok(())
    }
}
