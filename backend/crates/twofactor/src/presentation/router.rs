//! Two-Factor Router

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use platform::rate_limit::{CounterStore, InMemoryCounterStore};

use crate::application::config::TwoFactorConfig;
use crate::application::throttle::LoginThrottle;
use crate::domain::repository::{CredentialStore, SecondFactorRepository, TrustedDeviceRepository};
use crate::infra::postgres::PgTwoFactorRepository;
use crate::presentation::handlers::{self, TwoFactorAppState};
use crate::presentation::middleware::{DeviceActivityState, refresh_device_activity};

/// Create the two-factor router with PostgreSQL repository and an
/// in-process counter store
pub fn two_factor_router(repo: PgTwoFactorRepository, config: TwoFactorConfig) -> Router {
    let store = Arc::new(InMemoryCounterStore::new());
    two_factor_router_generic(repo, store, config)
}

/// Create a generic two-factor router for any repository and counter store
pub fn two_factor_router_generic<R, S>(repo: R, store: Arc<S>, config: TwoFactorConfig) -> Router
where
    R: SecondFactorRepository
        + TrustedDeviceRepository
        + CredentialStore
        + Clone
        + Send
        + Sync
        + 'static,
    S: CounterStore + Send + Sync + 'static,
{
    let throttle = Arc::new(LoginThrottle::new(
        store,
        config.account_limit.clone(),
        config.origin_limit.clone(),
    ));

    let state = TwoFactorAppState {
        repo: Arc::new(repo),
        throttle,
        config: Arc::new(config),
    };

    let activity_state = DeviceActivityState {
        repo: state.repo.clone(),
        config: state.config.clone(),
    };

    Router::new()
        .route("/login-attempt", post(handlers::login_attempt::<R, S>))
        .route("/login", post(handlers::login::<R, S>))
        .route("/2fa/setup", post(handlers::setup::<R, S>))
        .route("/2fa/verify", post(handlers::verify_enrollment::<R, S>))
        .route("/2fa/verify-login", post(handlers::verify_login::<R, S>))
        .route("/2fa/disable", post(handlers::disable::<R, S>))
        .route("/2fa/devices", get(handlers::list_devices::<R, S>))
        .route(
            "/2fa/devices/{id}",
            axum::routing::delete(handlers::revoke_device::<R, S>),
        )
        .layer(axum::middleware::from_fn(move |req, next| {
            refresh_device_activity(activity_state.clone(), req, next)
        }))
        .with_state(state)
}
