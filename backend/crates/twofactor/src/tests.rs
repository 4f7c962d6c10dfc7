//! Unit tests for the two-factor crate
//!
//! End-to-end use-case scenarios over in-memory repositories, covering
//! the login orchestration, enrollment, device trust and throttling
//! paths, including degraded-storage behavior.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use uuid::Uuid;

use crate::application::config::TwoFactorConfig;
use crate::application::{
    DeviceTrustLedger, DisableUseCase, EnrollUseCase, LoginInput, LoginOutcome, LoginThrottle,
    LoginUseCase, VerifyLoginUseCase,
};
use crate::domain::entity::{second_factor::SecondFactorConfig, trusted_device::TrustedDevice};
use crate::domain::repository::{
    CredentialStore, SecondFactorRepository, TrustedDeviceRepository,
};
use crate::domain::value_object::{
    totp_secret::TotpSecret, trust_token::TrustToken, user_id::UserId,
};
use crate::error::{TwoFactorError, TwoFactorResult};
use platform::rate_limit::InMemoryCounterStore;

// ============================================================================
// In-memory repository doubles
// ============================================================================

#[derive(Default)]
struct MockRepo {
    users: Mutex<HashMap<String, (UserId, String)>>,
    configs: Mutex<HashMap<Uuid, SecondFactorConfig>>,
    devices: Mutex<Vec<TrustedDevice>>,
    /// Simulate second-factor storage loss
    fail_configs: AtomicBool,
    /// Simulate trust-ledger storage loss
    fail_devices: AtomicBool,
}

impl MockRepo {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn add_user(&self, email: &str, password: &str) -> UserId {
        let user_id = UserId::new();
        self.users
            .lock()
            .unwrap()
            .insert(email.to_string(), (user_id, password.to_string()));
        user_id
    }

    fn device_count(&self, user_id: &UserId) -> usize {
        self.devices
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.user_id == *user_id)
            .count()
    }

    fn config_err<T>(&self) -> Option<TwoFactorResult<T>> {
        if self.fail_configs.load(Ordering::SeqCst) {
            Some(Err(TwoFactorError::Internal("config storage down".into())))
        } else {
            None
        }
    }

    fn device_err<T>(&self) -> Option<TwoFactorResult<T>> {
        if self.fail_devices.load(Ordering::SeqCst) {
            Some(Err(TwoFactorError::LedgerUnavailable))
        } else {
            None
        }
    }
}

impl CredentialStore for MockRepo {
    async fn authenticate(&self, email: &str, password: &str) -> TwoFactorResult<Option<UserId>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .get(email)
            .filter(|(_, stored)| stored == password)
            .map(|(id, _)| *id))
    }
}

impl SecondFactorRepository for MockRepo {
    async fn find_config(&self, user_id: &UserId) -> TwoFactorResult<Option<SecondFactorConfig>> {
        if let Some(err) = self.config_err() {
            return err;
        }
        Ok(self.configs.lock().unwrap().get(&user_id.as_uuid()).cloned())
    }

    async fn save_config(&self, config: &SecondFactorConfig) -> TwoFactorResult<()> {
        if let Some(err) = self.config_err() {
            return err;
        }
        self.configs
            .lock()
            .unwrap()
            .insert(config.user_id.as_uuid(), config.clone());
        Ok(())
    }

    async fn clear_config(&self, user_id: &UserId) -> TwoFactorResult<()> {
        if let Some(err) = self.config_err() {
            return err;
        }
        self.configs.lock().unwrap().remove(&user_id.as_uuid());
        Ok(())
    }
}

impl TrustedDeviceRepository for MockRepo {
    async fn insert_device(&self, device: &TrustedDevice) -> TwoFactorResult<()> {
        if let Some(err) = self.device_err() {
            return err;
        }
        self.devices.lock().unwrap().push(device.clone());
        Ok(())
    }

    async fn find_device(
        &self,
        user_id: &UserId,
        token_hash: &[u8],
    ) -> TwoFactorResult<Option<TrustedDevice>> {
        if let Some(err) = self.device_err() {
            return err;
        }
        Ok(self
            .devices
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.user_id == *user_id && d.token_hash == token_hash)
            .cloned())
    }

    async fn touch_device(&self, token_hash: &[u8]) -> TwoFactorResult<Option<UserId>> {
        if let Some(err) = self.device_err() {
            return err;
        }
        let mut devices = self.devices.lock().unwrap();
        Ok(devices.iter_mut().find(|d| d.token_hash == token_hash).map(
            |d| {
                d.touch();
                d.user_id
            },
        ))
    }

    async fn list_devices(&self, user_id: &UserId) -> TwoFactorResult<Vec<TrustedDevice>> {
        if let Some(err) = self.device_err() {
            return err;
        }
        let mut devices: Vec<_> = self
            .devices
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.user_id == *user_id)
            .cloned()
            .collect();
        devices.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        Ok(devices)
    }

    async fn delete_device(&self, user_id: &UserId, device_id: Uuid) -> TwoFactorResult<bool> {
        if let Some(err) = self.device_err() {
            return err;
        }
        let mut devices = self.devices.lock().unwrap();
        let before = devices.len();
        devices.retain(|d| !(d.user_id == *user_id && d.id == device_id));
        Ok(devices.len() < before)
    }

    async fn delete_all_devices(&self, user_id: &UserId) -> TwoFactorResult<u64> {
        if let Some(err) = self.device_err() {
            return err;
        }
        let mut devices = self.devices.lock().unwrap();
        let before = devices.len();
        devices.retain(|d| d.user_id != *user_id);
        Ok((before - devices.len()) as u64)
    }
}

// ============================================================================
// Test fixtures
// ============================================================================

fn throttle() -> Arc<LoginThrottle<InMemoryCounterStore>> {
    let config = TwoFactorConfig::default();
    Arc::new(LoginThrottle::new(
        Arc::new(InMemoryCounterStore::new()),
        config.account_limit,
        config.origin_limit,
    ))
}

fn login_use_case(
    repo: &Arc<MockRepo>,
) -> LoginUseCase<MockRepo, MockRepo, MockRepo, InMemoryCounterStore> {
    LoginUseCase::new(repo.clone(), repo.clone(), repo.clone(), throttle())
}

fn enroll_use_case(repo: &Arc<MockRepo>) -> EnrollUseCase<MockRepo, MockRepo> {
    EnrollUseCase::new(
        repo.clone(),
        repo.clone(),
        Arc::new(TwoFactorConfig::default()),
    )
}

fn enable_2fa(repo: &Arc<MockRepo>, user_id: UserId) -> TotpSecret {
    let secret = TotpSecret::generate();
    repo.configs.lock().unwrap().insert(
        user_id.as_uuid(),
        SecondFactorConfig::confirmed(user_id, secret.clone()),
    );
    secret
}

fn login_input(email: &str, password: &str, trust_token: Option<TrustToken>) -> LoginInput {
    LoginInput {
        email: email.to_string(),
        password: password.to_string(),
        trust_token,
    }
}

// ============================================================================
// Login orchestration
// ============================================================================

#[cfg(test)]
mod login_tests {
    use super::*;

    #[tokio::test]
    async fn test_login_without_config_completes() {
        let repo = MockRepo::new();
        let user_id = repo.add_user("a@example.com", "hunter2");

        let outcome = login_use_case(&repo)
            .execute(login_input("a@example.com", "hunter2", None), "1.2.3.4")
            .await
            .unwrap();

        assert_eq!(outcome, LoginOutcome::Complete { user_id });
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let repo = MockRepo::new();
        repo.add_user("a@example.com", "hunter2");

        let err = login_use_case(&repo)
            .execute(login_input("a@example.com", "wrong", None), "1.2.3.4")
            .await
            .unwrap_err();

        assert!(matches!(err, TwoFactorError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_unknown_email_rejected_identically() {
        let repo = MockRepo::new();

        let err = login_use_case(&repo)
            .execute(login_input("nobody@example.com", "x", None), "1.2.3.4")
            .await
            .unwrap_err();

        assert!(matches!(err, TwoFactorError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_enabled_config_requires_second_factor() {
        let repo = MockRepo::new();
        let user_id = repo.add_user("a@example.com", "hunter2");
        enable_2fa(&repo, user_id);

        let outcome = login_use_case(&repo)
            .execute(login_input("a@example.com", "hunter2", None), "1.2.3.4")
            .await
            .unwrap();

        assert_eq!(outcome, LoginOutcome::SecondFactorRequired { user_id });
    }

    #[tokio::test]
    async fn test_trusted_device_skips_challenge() {
        let repo = MockRepo::new();
        let user_id = repo.add_user("a@example.com", "hunter2");
        enable_2fa(&repo, user_id);

        let ledger = DeviceTrustLedger::new(repo.clone());
        let token = ledger.issue(&user_id, "Mozilla/5.0").await;

        let outcome = login_use_case(&repo)
            .execute(
                login_input("a@example.com", "hunter2", Some(token)),
                "1.2.3.4",
            )
            .await
            .unwrap();

        assert_eq!(outcome, LoginOutcome::Complete { user_id });
    }

    #[tokio::test]
    async fn test_foreign_token_still_challenged() {
        let repo = MockRepo::new();
        let alice = repo.add_user("a@example.com", "hunter2");
        let bob = repo.add_user("b@example.com", "hunter2");
        enable_2fa(&repo, alice);
        enable_2fa(&repo, bob);

        // Token issued for bob, presented at alice's login
        let ledger = DeviceTrustLedger::new(repo.clone());
        let bobs_token = ledger.issue(&bob, "Mozilla/5.0").await;

        let outcome = login_use_case(&repo)
            .execute(
                login_input("a@example.com", "hunter2", Some(bobs_token)),
                "1.2.3.4",
            )
            .await
            .unwrap();

        assert_eq!(outcome, LoginOutcome::SecondFactorRequired { user_id: alice });
    }

    #[tokio::test]
    async fn test_mutated_token_still_challenged() {
        let repo = MockRepo::new();
        let user_id = repo.add_user("a@example.com", "hunter2");
        enable_2fa(&repo, user_id);

        let ledger = DeviceTrustLedger::new(repo.clone());
        let token = ledger.issue(&user_id, "Mozilla/5.0").await;

        let mutated = TrustToken::from_cookie(&format!("{}x", token.expose())).unwrap();

        let outcome = login_use_case(&repo)
            .execute(
                login_input("a@example.com", "hunter2", Some(mutated)),
                "1.2.3.4",
            )
            .await
            .unwrap();

        assert_eq!(outcome, LoginOutcome::SecondFactorRequired { user_id });
    }

    #[tokio::test]
    async fn test_config_lookup_failure_fails_open() {
        let repo = MockRepo::new();
        let user_id = repo.add_user("a@example.com", "hunter2");
        enable_2fa(&repo, user_id);
        repo.fail_configs.store(true, Ordering::SeqCst);

        let outcome = login_use_case(&repo)
            .execute(login_input("a@example.com", "hunter2", None), "1.2.3.4")
            .await
            .unwrap();

        assert_eq!(outcome, LoginOutcome::Complete { user_id });
    }

    #[tokio::test]
    async fn test_ledger_failure_fails_closed() {
        let repo = MockRepo::new();
        let user_id = repo.add_user("a@example.com", "hunter2");
        enable_2fa(&repo, user_id);

        let ledger = DeviceTrustLedger::new(repo.clone());
        let token = ledger.issue(&user_id, "Mozilla/5.0").await;

        // Ledger goes down between issuance and the next login
        repo.fail_devices.store(true, Ordering::SeqCst);

        let outcome = login_use_case(&repo)
            .execute(
                login_input("a@example.com", "hunter2", Some(token)),
                "1.2.3.4",
            )
            .await
            .unwrap();

        assert_eq!(outcome, LoginOutcome::SecondFactorRequired { user_id });
    }
}

// ============================================================================
// Throttling at the orchestrator boundary
// ============================================================================

#[cfg(test)]
mod throttle_tests {
    use super::*;

    #[tokio::test]
    async fn test_sixth_attempt_denied_with_retry_after() {
        let repo = MockRepo::new();
        repo.add_user("a@example.com", "hunter2");
        let use_case = login_use_case(&repo);

        for _ in 0..5 {
            let err = use_case
                .execute(login_input("a@example.com", "wrong", None), "1.2.3.4")
                .await
                .unwrap_err();
            assert!(matches!(err, TwoFactorError::InvalidCredentials));
        }

        let sixth = use_case
            .execute(login_input("a@example.com", "hunter2", None), "1.2.3.4")
            .await
            .unwrap_err();

        let TwoFactorError::ThrottleExceeded { retry_after_secs } = sixth else {
            panic!("expected throttle denial, got {sixth:?}");
        };
        assert!(retry_after_secs > 0);
        assert!(retry_after_secs <= 900);
    }

    #[tokio::test]
    async fn test_denied_attempt_never_reaches_credentials() {
        let repo = MockRepo::new();
        let user_id = repo.add_user("a@example.com", "hunter2");
        enable_2fa(&repo, user_id);
        let use_case = login_use_case(&repo);

        for _ in 0..5 {
            let _ = use_case
                .execute(login_input("a@example.com", "wrong", None), "1.2.3.4")
                .await;
        }

        // Correct password, but the window is exhausted
        let err = use_case
            .execute(login_input("a@example.com", "hunter2", None), "1.2.3.4")
            .await
            .unwrap_err();
        assert!(matches!(err, TwoFactorError::ThrottleExceeded { .. }));
    }
}

// ============================================================================
// Enrollment
// ============================================================================

#[cfg(test)]
mod enroll_tests {
    use super::*;

    #[tokio::test]
    async fn test_setup_persists_nothing() {
        let repo = MockRepo::new();
        let user_id = repo.add_user("a@example.com", "hunter2");

        let output = enroll_use_case(&repo)
            .setup(&user_id, "a@example.com")
            .unwrap();

        assert!(!output.secret.is_empty());
        assert!(output.otpauth_uri.starts_with("otpauth://totp/"));
        assert!(repo.configs.lock().unwrap().is_empty());
        assert_eq!(repo.device_count(&user_id), 0);
    }

    #[tokio::test]
    async fn test_verify_persists_config_and_trusts_device() {
        let repo = MockRepo::new();
        let user_id = repo.add_user("a@example.com", "hunter2");

        let output = enroll_use_case(&repo)
            .setup(&user_id, "a@example.com")
            .unwrap();
        let secret = TotpSecret::from_base32(output.secret.clone()).unwrap();

        let token = enroll_use_case(&repo)
            .verify(&user_id, &output.secret, &secret.generate_current(), "UA")
            .await
            .unwrap();

        let config = repo
            .configs
            .lock()
            .unwrap()
            .get(&user_id.as_uuid())
            .cloned()
            .unwrap();
        assert!(config.enabled);
        assert_eq!(config.secret.as_base32(), output.secret);

        // The enrolling device is auto-trusted
        let ledger = DeviceTrustLedger::new(repo.clone());
        assert!(ledger.is_trusted(&user_id, &token).await);
    }

    #[tokio::test]
    async fn test_verify_with_wrong_code_persists_nothing() {
        let repo = MockRepo::new();
        let user_id = repo.add_user("a@example.com", "hunter2");

        let output = enroll_use_case(&repo)
            .setup(&user_id, "a@example.com")
            .unwrap();

        let err = enroll_use_case(&repo)
            .verify(&user_id, &output.secret, "000000", "UA")
            .await
            .unwrap_err();

        assert!(matches!(err, TwoFactorError::InvalidCode));
        assert!(repo.configs.lock().unwrap().is_empty());
        assert_eq!(repo.device_count(&user_id), 0);
    }

    #[tokio::test]
    async fn test_verify_with_garbage_secret_is_invalid_code() {
        let repo = MockRepo::new();
        let user_id = repo.add_user("a@example.com", "hunter2");

        let err = enroll_use_case(&repo)
            .verify(&user_id, "!!not-base32!!", "000000", "UA")
            .await
            .unwrap_err();

        assert!(matches!(err, TwoFactorError::InvalidCode));
    }
}

// ============================================================================
// Login-time challenge
// ============================================================================

#[cfg(test)]
mod verify_login_tests {
    use super::*;

    fn use_case(repo: &Arc<MockRepo>) -> VerifyLoginUseCase<MockRepo, MockRepo> {
        VerifyLoginUseCase::new(repo.clone(), repo.clone())
    }

    #[tokio::test]
    async fn test_valid_code_trusts_device_and_completes_next_login() {
        let repo = MockRepo::new();
        let user_id = repo.add_user("a@example.com", "hunter2");
        let secret = enable_2fa(&repo, user_id);

        let token = use_case(&repo)
            .execute(&user_id, &secret.generate_current(), "UA")
            .await
            .unwrap();

        // The same browser logs in again without a challenge
        let outcome = login_use_case(&repo)
            .execute(
                login_input("a@example.com", "hunter2", Some(token)),
                "1.2.3.4",
            )
            .await
            .unwrap();
        assert_eq!(outcome, LoginOutcome::Complete { user_id });
    }

    #[tokio::test]
    async fn test_wrong_code_leaves_challenge_retryable() {
        let repo = MockRepo::new();
        let user_id = repo.add_user("a@example.com", "hunter2");
        let secret = enable_2fa(&repo, user_id);

        let err = use_case(&repo)
            .execute(&user_id, "000000", "UA")
            .await
            .unwrap_err();
        assert!(matches!(err, TwoFactorError::InvalidCode));

        // Retry with the right code still succeeds
        let token = use_case(&repo)
            .execute(&user_id, &secret.generate_current(), "UA")
            .await;
        assert!(token.is_ok());
    }

    #[tokio::test]
    async fn test_no_enrollment_is_configuration_missing() {
        let repo = MockRepo::new();
        let user_id = repo.add_user("a@example.com", "hunter2");

        let err = use_case(&repo)
            .execute(&user_id, "123456", "UA")
            .await
            .unwrap_err();
        assert!(matches!(err, TwoFactorError::ConfigurationMissing));
    }
}

// ============================================================================
// Device trust ledger
// ============================================================================

#[cfg(test)]
mod ledger_tests {
    use super::*;

    #[tokio::test]
    async fn test_issue_then_trusted_roundtrip() {
        let repo = MockRepo::new();
        let user_id = UserId::new();
        let ledger = DeviceTrustLedger::new(repo.clone());

        let token = ledger.issue(&user_id, "Mozilla/5.0").await;

        assert!(ledger.is_trusted(&user_id, &token).await);
        assert_eq!(repo.device_count(&user_id), 1);

        // Only the hash is stored
        let devices = repo.devices.lock().unwrap();
        assert_eq!(devices[0].token_hash, token.hash());
        assert_ne!(devices[0].token_hash, token.expose().as_bytes());
    }

    #[tokio::test]
    async fn test_touch_unknown_token_is_noop() {
        let repo = MockRepo::new();
        let ledger = DeviceTrustLedger::new(repo.clone());

        let owner = ledger.touch(&TrustToken::generate()).await;
        assert!(owner.is_none());
    }

    #[tokio::test]
    async fn test_touch_resolves_owner() {
        let repo = MockRepo::new();
        let user_id = UserId::new();
        let ledger = DeviceTrustLedger::new(repo.clone());

        let token = ledger.issue(&user_id, "Mozilla/5.0").await;
        assert_eq!(ledger.touch(&token).await, Some(user_id));
    }

    #[tokio::test]
    async fn test_issue_survives_ledger_outage() {
        let repo = MockRepo::new();
        repo.fail_devices.store(true, Ordering::SeqCst);
        let user_id = UserId::new();
        let ledger = DeviceTrustLedger::new(repo.clone());

        // The caller still gets a cookie value; only the server record is lost
        let token = ledger.issue(&user_id, "Mozilla/5.0").await;
        assert!(!token.expose().is_empty());
        assert_eq!(repo.device_count(&user_id), 0);
    }

    #[tokio::test]
    async fn test_revoke_single_device() {
        let repo = MockRepo::new();
        let user_id = UserId::new();
        let ledger = DeviceTrustLedger::new(repo.clone());

        ledger.issue(&user_id, "laptop").await;
        ledger.issue(&user_id, "phone").await;

        let devices = ledger.list(&user_id).await.unwrap();
        assert_eq!(devices.len(), 2);

        let revoked = ledger.revoke(&user_id, Some(devices[0].id)).await.unwrap();
        assert_eq!(revoked, 1);
        assert_eq!(repo.device_count(&user_id), 1);
    }

    #[tokio::test]
    async fn test_revoke_unknown_device_is_not_found() {
        let repo = MockRepo::new();
        let user_id = UserId::new();
        let ledger = DeviceTrustLedger::new(repo.clone());

        let err = ledger
            .revoke(&user_id, Some(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, TwoFactorError::DeviceNotFound));
    }

    #[tokio::test]
    async fn test_revoke_is_owner_scoped() {
        let repo = MockRepo::new();
        let alice = UserId::new();
        let bob = UserId::new();
        let ledger = DeviceTrustLedger::new(repo.clone());

        ledger.issue(&bob, "bobs laptop").await;
        let bobs_device = ledger.list(&bob).await.unwrap()[0].id;

        let err = ledger.revoke(&alice, Some(bobs_device)).await.unwrap_err();
        assert!(matches!(err, TwoFactorError::DeviceNotFound));
        assert_eq!(repo.device_count(&bob), 1);
    }
}

// ============================================================================
// Disable
// ============================================================================

#[cfg(test)]
mod disable_tests {
    use super::*;

    #[tokio::test]
    async fn test_disable_clears_config_and_devices() {
        let repo = MockRepo::new();
        let user_id = repo.add_user("a@example.com", "hunter2");
        enable_2fa(&repo, user_id);

        let ledger = DeviceTrustLedger::new(repo.clone());
        ledger.issue(&user_id, "laptop").await;
        ledger.issue(&user_id, "phone").await;

        DisableUseCase::new(repo.clone(), repo.clone())
            .execute(&user_id)
            .await
            .unwrap();

        assert!(repo.configs.lock().unwrap().is_empty());
        assert_eq!(repo.device_count(&user_id), 0);

        // Subsequent login needs no second factor
        let outcome = login_use_case(&repo)
            .execute(login_input("a@example.com", "hunter2", None), "1.2.3.4")
            .await
            .unwrap();
        assert_eq!(outcome, LoginOutcome::Complete { user_id });
    }

    #[tokio::test]
    async fn test_disable_leaves_other_users_untouched() {
        let repo = MockRepo::new();
        let alice = repo.add_user("a@example.com", "hunter2");
        let bob = repo.add_user("b@example.com", "hunter2");
        enable_2fa(&repo, alice);
        enable_2fa(&repo, bob);

        let ledger = DeviceTrustLedger::new(repo.clone());
        ledger.issue(&alice, "laptop").await;
        ledger.issue(&bob, "laptop").await;

        DisableUseCase::new(repo.clone(), repo.clone())
            .execute(&alice)
            .await
            .unwrap();

        assert_eq!(repo.device_count(&alice), 0);
        assert_eq!(repo.device_count(&bob), 1);
        assert!(repo.configs.lock().unwrap().contains_key(&bob.as_uuid()));
    }

    #[tokio::test]
    async fn test_revocation_failure_keeps_config() {
        let repo = MockRepo::new();
        let user_id = repo.add_user("a@example.com", "hunter2");
        enable_2fa(&repo, user_id);
        repo.fail_devices.store(true, Ordering::SeqCst);

        let err = DisableUseCase::new(repo.clone(), repo.clone())
            .execute(&user_id)
            .await
            .unwrap_err();
        assert!(matches!(err, TwoFactorError::LedgerUnavailable));

        // 2FA stays in force
        assert!(
            repo.configs
                .lock()
                .unwrap()
                .contains_key(&user_id.as_uuid())
        );
    }
}
