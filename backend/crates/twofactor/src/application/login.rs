//! Login Use Case
//!
//! The orchestrated login flow: throttle admission, credential check,
//! second-factor requirement lookup, and device-trust resolution. A
//! required second factor is a flow state returned to the caller, not an
//! error and not a blocked thread; the user completes it with a separate
//! request.

use std::sync::Arc;

use crate::application::ledger::DeviceTrustLedger;
use crate::application::throttle::LoginThrottle;
use crate::domain::repository::{CredentialStore, SecondFactorRepository, TrustedDeviceRepository};
use crate::domain::value_object::{trust_token::TrustToken, user_id::UserId};
use crate::error::{TwoFactorError, TwoFactorResult};
use platform::rate_limit::CounterStore;

/// Login input
pub struct LoginInput {
    pub email: String,
    pub password: String,
    /// Device-trust cookie value, if the browser presented one
    pub trust_token: Option<TrustToken>,
}

/// Login outcome surfaced to the HTTP layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Authentication finished; no second factor owed
    Complete { user_id: UserId },
    /// Password accepted; a TOTP code must be submitted to proceed
    SecondFactorRequired { user_id: UserId },
}

/// Login use case
pub struct LoginUseCase<C, F, D, S>
where
    C: CredentialStore,
    F: SecondFactorRepository,
    D: TrustedDeviceRepository,
    S: CounterStore + Send + Sync,
{
    credentials: Arc<C>,
    config_repo: Arc<F>,
    ledger: DeviceTrustLedger<D>,
    throttle: Arc<LoginThrottle<S>>,
}

impl<C, F, D, S> LoginUseCase<C, F, D, S>
where
    C: CredentialStore,
    F: SecondFactorRepository,
    D: TrustedDeviceRepository,
    S: CounterStore + Send + Sync,
{
    pub fn new(
        credentials: Arc<C>,
        config_repo: Arc<F>,
        device_repo: Arc<D>,
        throttle: Arc<LoginThrottle<S>>,
    ) -> Self {
        Self {
            credentials,
            config_repo,
            ledger: DeviceTrustLedger::new(device_repo),
            throttle,
        }
    }

    pub async fn execute(
        &self,
        input: LoginInput,
        origin_key: &str,
    ) -> TwoFactorResult<LoginOutcome> {
        // Admission before credentials are ever examined
        let decision = self.throttle.admit(Some(&input.email), origin_key).await;
        if !decision.allowed {
            return Err(TwoFactorError::ThrottleExceeded {
                retry_after_secs: decision.retry_after_secs,
            });
        }

        let user_id = self
            .credentials
            .authenticate(&input.email, &input.password)
            .await?
            .ok_or(TwoFactorError::InvalidCredentials)?;

        // A config lookup failure must not block login: proceed without a
        // second factor, logged as degraded (availability over security on
        // infrastructure loss).
        let config = match self.config_repo.find_config(&user_id).await {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(
                    user_id = %user_id,
                    error = %e,
                    "Second-factor lookup failed; completing login without challenge"
                );
                None
            }
        };

        let requires_second_factor = config.map(|c| c.is_active()).unwrap_or(false);
        if !requires_second_factor {
            tracing::info!(user_id = %user_id, "Login complete, no second factor configured");
            return Ok(LoginOutcome::Complete { user_id });
        }

        // Trust lookup errors fail closed inside the ledger
        if let Some(token) = &input.trust_token {
            if self.ledger.is_trusted(&user_id, token).await {
                self.ledger.touch(token).await;
                tracing::info!(user_id = %user_id, "Login complete via trusted device");
                return Ok(LoginOutcome::Complete { user_id });
            }
        }

        tracing::info!(user_id = %user_id, "Login suspended pending second factor");
        Ok(LoginOutcome::SecondFactorRequired { user_id })
    }
}
