//! Login Throttle
//!
//! Fixed-window admission control applied before credentials are checked.
//! Two independent counters: a tight per-account window and a high-ceiling
//! per-origin window. A denial is terminal for the request; the caller
//! retries after the indicated delay.

use std::sync::Arc;

use chrono::Utc;
use platform::rate_limit::{CounterStore, RateLimitConfig};

/// Outcome of an admission check
#[derive(Debug, Clone)]
pub struct ThrottleDecision {
    pub allowed: bool,
    /// Seconds until the denying window elapses, ceiling-rounded
    pub retry_after_secs: u64,
}

impl ThrottleDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            retry_after_secs: 0,
        }
    }

    fn deny(retry_after_secs: u64) -> Self {
        Self {
            allowed: false,
            retry_after_secs,
        }
    }
}

/// Login throttle over an injected counter store
pub struct LoginThrottle<S>
where
    S: CounterStore + Send + Sync,
{
    store: Arc<S>,
    account_limit: RateLimitConfig,
    origin_limit: RateLimitConfig,
}

impl<S> LoginThrottle<S>
where
    S: CounterStore + Send + Sync,
{
    pub fn new(store: Arc<S>, account_limit: RateLimitConfig, origin_limit: RateLimitConfig) -> Self {
        Self {
            store,
            account_limit,
            origin_limit,
        }
    }

    /// Admit or deny a login attempt.
    ///
    /// The origin counter is incremented first; exceeding it denies before
    /// the account counter is touched. An account counter in excess denies
    /// independently of origin state.
    pub async fn admit(&self, account_key: Option<&str>, origin_key: &str) -> ThrottleDecision {
        self.admit_at(account_key, origin_key, Utc::now().timestamp_millis())
            .await
    }

    /// Admission check against an explicit clock (test seam)
    pub async fn admit_at(
        &self,
        account_key: Option<&str>,
        origin_key: &str,
        now_ms: i64,
    ) -> ThrottleDecision {
        let origin = self
            .store
            .increment(&format!("origin:{origin_key}"), &self.origin_limit, now_ms)
            .await;

        if !origin.allowed {
            tracing::warn!(origin = origin_key, count = origin.count, "Origin throttled");
            return ThrottleDecision::deny(origin.retry_after_secs);
        }

        if let Some(account) = account_key {
            // Account keys are emails; case is not identity-bearing
            let key = format!("account:{}", account.trim().to_lowercase());
            let result = self.store.increment(&key, &self.account_limit, now_ms).await;

            if !result.allowed {
                tracing::warn!(count = result.count, "Account throttled");
                return ThrottleDecision::deny(result.retry_after_secs);
            }
        }

        ThrottleDecision::allow()
    }
}
