//! Repository Traits
//!
//! Interfaces for data persistence and for the external credential store.
//! Implementations live in the infrastructure layer.

use crate::domain::entity::{second_factor::SecondFactorConfig, trusted_device::TrustedDevice};
use crate::domain::value_object::user_id::UserId;
use crate::error::TwoFactorResult;
use uuid::Uuid;

/// Second-factor configuration repository trait
#[trait_variant::make(SecondFactorRepository: Send)]
pub trait LocalSecondFactorRepository {
    /// Find a user's configuration; `None` means 2FA is disabled
    async fn find_config(&self, user_id: &UserId) -> TwoFactorResult<Option<SecondFactorConfig>>;

    /// Persist a configuration (insert or replace)
    async fn save_config(&self, config: &SecondFactorConfig) -> TwoFactorResult<()>;

    /// Remove a user's configuration entirely
    async fn clear_config(&self, user_id: &UserId) -> TwoFactorResult<()>;
}

/// Trusted device repository trait
///
/// Lookups are scoped by `(user_id, token_hash)`; a token presented for
/// the wrong user never matches.
#[trait_variant::make(TrustedDeviceRepository: Send)]
pub trait LocalTrustedDeviceRepository {
    /// Persist a new trusted device record
    async fn insert_device(&self, device: &TrustedDevice) -> TwoFactorResult<()>;

    /// Find a device by owner and token hash
    async fn find_device(
        &self,
        user_id: &UserId,
        token_hash: &[u8],
    ) -> TwoFactorResult<Option<TrustedDevice>>;

    /// Bump `last_seen` for the record matching the token hash.
    /// Returns the owner when a record matched.
    async fn touch_device(&self, token_hash: &[u8]) -> TwoFactorResult<Option<UserId>>;

    /// All trusted devices of a user, most recently seen first
    async fn list_devices(&self, user_id: &UserId) -> TwoFactorResult<Vec<TrustedDevice>>;

    /// Delete one device, scoped to its owner. Returns whether a record
    /// was deleted.
    async fn delete_device(&self, user_id: &UserId, device_id: Uuid) -> TwoFactorResult<bool>;

    /// Delete all devices of a user, returning the count
    async fn delete_all_devices(&self, user_id: &UserId) -> TwoFactorResult<u64>;
}

/// External credential store contract
///
/// Identity and password verification are a consumed collaborator; the
/// orchestrator only sees accept/reject.
#[trait_variant::make(CredentialStore: Send)]
pub trait LocalCredentialStore {
    /// Authenticate an email/password pair. `None` means rejected;
    /// the caller must not learn why.
    async fn authenticate(&self, email: &str, password: &str) -> TwoFactorResult<Option<UserId>>;
}
