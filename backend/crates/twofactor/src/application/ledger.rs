//! Device Trust Ledger
//!
//! Application service over the trusted-device repository. This is where
//! the degraded-storage policy lives: trust checks fail closed, issuance
//! still hands the caller a raw token for the client-side cookie, and
//! `touch` is always a no-op on failure.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::entity::trusted_device::TrustedDevice;
use crate::domain::repository::TrustedDeviceRepository;
use crate::domain::value_object::{trust_token::TrustToken, user_id::UserId};
use crate::error::{TwoFactorError, TwoFactorResult};

/// Device trust ledger service
pub struct DeviceTrustLedger<D>
where
    D: TrustedDeviceRepository,
{
    repo: Arc<D>,
}

impl<D> DeviceTrustLedger<D>
where
    D: TrustedDeviceRepository,
{
    pub fn new(repo: Arc<D>) -> Self {
        Self { repo }
    }

    /// Issue a fresh trust token for a device that just completed 2FA.
    ///
    /// Persists only the token hash. If the ledger storage is unavailable
    /// the raw token is still returned so the caller can set the cookie;
    /// server-side confirmation is simply absent until storage recovers.
    pub async fn issue(&self, user_id: &UserId, user_agent: &str) -> TrustToken {
        let token = TrustToken::generate();
        let device = TrustedDevice::new(*user_id, token.hash(), user_agent);

        match self.repo.insert_device(&device).await {
            Ok(()) => {
                tracing::info!(
                    user_id = %user_id,
                    device_id = %device.id,
                    "Trusted device issued"
                );
            }
            Err(e) => {
                tracing::error!(
                    user_id = %user_id,
                    error = %e,
                    "Trust ledger write failed; issuing cookie without server-side record"
                );
            }
        }

        token
    }

    /// Whether a presented token resolves to a trusted record for this user.
    ///
    /// No match or any lookup error means untrusted (fail closed).
    pub async fn is_trusted(&self, user_id: &UserId, token: &TrustToken) -> bool {
        match self.repo.find_device(user_id, &token.hash()).await {
            Ok(Some(_)) => true,
            Ok(None) => false,
            Err(e) => {
                tracing::error!(
                    user_id = %user_id,
                    error = %e,
                    "Trust lookup failed; treating device as untrusted"
                );
                false
            }
        }
    }

    /// Bump `last_seen` for the device matching the token, if any.
    ///
    /// An unknown token is not an error; it means no update occurs.
    pub async fn touch(&self, token: &TrustToken) -> Option<UserId> {
        match self.repo.touch_device(&token.hash()).await {
            Ok(owner) => owner,
            Err(e) => {
                tracing::debug!(error = %e, "Trusted device touch skipped");
                None
            }
        }
    }

    /// List a user's trusted devices, most recently seen first
    pub async fn list(&self, user_id: &UserId) -> TwoFactorResult<Vec<TrustedDevice>> {
        self.repo.list_devices(user_id).await
    }

    /// Revoke one device (owner-scoped) or, with `None`, every device of
    /// the user. Returns the number of records removed.
    pub async fn revoke(&self, user_id: &UserId, device_id: Option<Uuid>) -> TwoFactorResult<u64> {
        match device_id {
            Some(id) => {
                if self.repo.delete_device(user_id, id).await? {
                    tracing::info!(user_id = %user_id, device_id = %id, "Trusted device revoked");
                    Ok(1)
                } else {
                    Err(TwoFactorError::DeviceNotFound)
                }
            }
            None => {
                let revoked = self.repo.delete_all_devices(user_id).await?;
                tracing::info!(user_id = %user_id, revoked, "All trusted devices revoked");
                Ok(revoked)
            }
        }
    }
}
