//! Device Activity Middleware
//!
//! Keeps `last_seen` fresh for trusted devices. Any request carrying the
//! trust cookie bumps the matching ledger record; requests are never
//! blocked or slowed by a ledger failure.

use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

use crate::application::DeviceTrustLedger;
use crate::application::config::TwoFactorConfig;
use crate::domain::repository::TrustedDeviceRepository;
use crate::domain::value_object::{trust_token::TrustToken, user_id::UserId};

/// Middleware state
#[derive(Clone)]
pub struct DeviceActivityState<D>
where
    D: TrustedDeviceRepository + Clone + Send + Sync + 'static,
{
    pub repo: Arc<D>,
    pub config: Arc<TwoFactorConfig>,
}

/// Device owner resolved from the trust cookie, stored in request
/// extensions for downstream handlers
#[derive(Clone, Copy)]
pub struct TrustedDeviceOwner(pub UserId);

/// Middleware that refreshes trusted-device activity
pub async fn refresh_device_activity<D>(
    state: DeviceActivityState<D>,
    mut req: Request<Body>,
    next: Next,
) -> Response
where
    D: TrustedDeviceRepository + Clone + Send + Sync + 'static,
{
    let token = platform::cookie::extract_cookie(req.headers(), &state.config.trust_cookie_name)
        .and_then(|v| TrustToken::from_cookie(&v));

    if let Some(token) = token {
        let ledger = DeviceTrustLedger::new(state.repo.clone());

        // An unknown or stale cookie is a no-op; touch swallows errors
        if let Some(owner) = ledger.touch(&token).await {
            req.extensions_mut().insert(TrustedDeviceOwner(owner));
        }
    }

    next.run(req).await
}
