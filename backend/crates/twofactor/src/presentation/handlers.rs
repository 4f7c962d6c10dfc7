//! HTTP Handlers

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use std::sync::Arc;
use uuid::Uuid;

use platform::client::{origin_key, user_agent};
use platform::cookie::{self, CookieConfig};

use crate::application::config::TwoFactorConfig;
use crate::application::{
    DeviceTrustLedger, DisableUseCase, EnrollUseCase, LoginInput, LoginOutcome, LoginThrottle,
    LoginUseCase, VerifyLoginUseCase,
};
use crate::domain::repository::{CredentialStore, SecondFactorRepository, TrustedDeviceRepository};
use crate::domain::value_object::{trust_token::TrustToken, user_id::UserId};
use crate::error::{TwoFactorError, TwoFactorResult};
use crate::presentation::dto::{
    DeviceListResponse, DeviceQuery, DisableRequest, EnrollVerifyRequest, LoginAttemptRequest,
    LoginRequest, LoginResponse, SetupRequest, SetupResponse, SuccessResponse, VerifyLoginRequest,
};
use platform::rate_limit::CounterStore;

/// Shared state for two-factor handlers
pub struct TwoFactorAppState<R, S>
where
    R: SecondFactorRepository + TrustedDeviceRepository + CredentialStore + Clone + Send + Sync + 'static,
    S: CounterStore + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub throttle: Arc<LoginThrottle<S>>,
    pub config: Arc<TwoFactorConfig>,
}

impl<R, S> Clone for TwoFactorAppState<R, S>
where
    R: SecondFactorRepository + TrustedDeviceRepository + CredentialStore + Clone + Send + Sync + 'static,
    S: CounterStore + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            throttle: self.throttle.clone(),
            config: self.config.clone(),
        }
    }
}

// ============================================================================
// Login Attempt (throttle pre-check)
// ============================================================================

/// POST /api/auth/login-attempt
pub async fn login_attempt<R, S>(
    State(state): State<TwoFactorAppState<R, S>>,
    headers: HeaderMap,
    axum::extract::ConnectInfo(addr): axum::extract::ConnectInfo<std::net::SocketAddr>,
    Json(req): Json<LoginAttemptRequest>,
) -> TwoFactorResult<Json<SuccessResponse>>
where
    R: SecondFactorRepository + TrustedDeviceRepository + CredentialStore + Clone + Send + Sync + 'static,
    S: CounterStore + Send + Sync + 'static,
{
    let origin = origin_key(&headers, Some(addr.ip()));

    let decision = state.throttle.admit(req.email.as_deref(), &origin).await;
    if !decision.allowed {
        return Err(TwoFactorError::ThrottleExceeded {
            retry_after_secs: decision.retry_after_secs,
        });
    }

    Ok(Json(SuccessResponse::ok()))
}

// ============================================================================
// Login
// ============================================================================

/// POST /api/auth/login
pub async fn login<R, S>(
    State(state): State<TwoFactorAppState<R, S>>,
    headers: HeaderMap,
    axum::extract::ConnectInfo(addr): axum::extract::ConnectInfo<std::net::SocketAddr>,
    Json(req): Json<LoginRequest>,
) -> TwoFactorResult<Json<LoginResponse>>
where
    R: SecondFactorRepository + TrustedDeviceRepository + CredentialStore + Clone + Send + Sync + 'static,
    S: CounterStore + Send + Sync + 'static,
{
    let origin = origin_key(&headers, Some(addr.ip()));
    let trust_token = extract_trust_cookie(&headers, &state.config);

    let use_case = LoginUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.repo.clone(),
        state.throttle.clone(),
    );

    let input = LoginInput {
        email: req.email,
        password: req.password,
        trust_token,
    };

    let outcome = use_case.execute(input, &origin).await?;

    let response = match outcome {
        LoginOutcome::Complete { user_id } => LoginResponse {
            user_id: user_id.as_uuid(),
            second_factor_required: false,
        },
        LoginOutcome::SecondFactorRequired { user_id } => LoginResponse {
            user_id: user_id.as_uuid(),
            second_factor_required: true,
        },
    };

    Ok(Json(response))
}

// ============================================================================
// Enrollment
// ============================================================================

/// POST /api/auth/2fa/setup
pub async fn setup<R, S>(
    State(state): State<TwoFactorAppState<R, S>>,
    Json(req): Json<SetupRequest>,
) -> TwoFactorResult<Json<SetupResponse>>
where
    R: SecondFactorRepository + TrustedDeviceRepository + CredentialStore + Clone + Send + Sync + 'static,
    S: CounterStore + Send + Sync + 'static,
{
    let use_case = EnrollUseCase::new(state.repo.clone(), state.repo.clone(), state.config.clone());

    let user_id = UserId::from_uuid(req.user_id);
    let output = use_case.setup(&user_id, &req.account_label)?;

    Ok(Json(SetupResponse {
        secret: output.secret,
        otpauth_uri: output.otpauth_uri,
        qr_image: output.qr_png_base64,
    }))
}

/// POST /api/auth/2fa/verify
pub async fn verify_enrollment<R, S>(
    State(state): State<TwoFactorAppState<R, S>>,
    headers: HeaderMap,
    Json(req): Json<EnrollVerifyRequest>,
) -> TwoFactorResult<impl IntoResponse>
where
    R: SecondFactorRepository + TrustedDeviceRepository + CredentialStore + Clone + Send + Sync + 'static,
    S: CounterStore + Send + Sync + 'static,
{
    let use_case = EnrollUseCase::new(state.repo.clone(), state.repo.clone(), state.config.clone());

    let user_id = UserId::from_uuid(req.user_id);
    let token = use_case
        .verify(&user_id, &req.secret, &req.code, &user_agent(&headers))
        .await?;

    let cookie = trust_cookie(&state.config).build_set_cookie(token.expose());

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(SuccessResponse::ok()),
    ))
}

// ============================================================================
// Login Challenge
// ============================================================================

/// POST /api/auth/2fa/verify-login
pub async fn verify_login<R, S>(
    State(state): State<TwoFactorAppState<R, S>>,
    headers: HeaderMap,
    Json(req): Json<VerifyLoginRequest>,
) -> TwoFactorResult<impl IntoResponse>
where
    R: SecondFactorRepository + TrustedDeviceRepository + CredentialStore + Clone + Send + Sync + 'static,
    S: CounterStore + Send + Sync + 'static,
{
    let use_case = VerifyLoginUseCase::new(state.repo.clone(), state.repo.clone());

    let user_id = UserId::from_uuid(req.user_id);
    let token = use_case
        .execute(&user_id, &req.code, &user_agent(&headers))
        .await?;

    let cookie = trust_cookie(&state.config).build_set_cookie(token.expose());

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(SuccessResponse::ok()),
    ))
}

// ============================================================================
// Disable
// ============================================================================

/// POST /api/auth/2fa/disable
pub async fn disable<R, S>(
    State(state): State<TwoFactorAppState<R, S>>,
    Json(req): Json<DisableRequest>,
) -> TwoFactorResult<impl IntoResponse>
where
    R: SecondFactorRepository + TrustedDeviceRepository + CredentialStore + Clone + Send + Sync + 'static,
    S: CounterStore + Send + Sync + 'static,
{
    let use_case = DisableUseCase::new(state.repo.clone(), state.repo.clone());

    let user_id = UserId::from_uuid(req.user_id);
    use_case.execute(&user_id).await?;

    // The cookie on this browser is now meaningless; clear it
    let cookie = trust_cookie(&state.config).build_delete_cookie();

    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]))
}

// ============================================================================
// Trusted Devices
// ============================================================================

/// GET /api/auth/2fa/devices
pub async fn list_devices<R, S>(
    State(state): State<TwoFactorAppState<R, S>>,
    Query(query): Query<DeviceQuery>,
) -> TwoFactorResult<Json<DeviceListResponse>>
where
    R: SecondFactorRepository + TrustedDeviceRepository + CredentialStore + Clone + Send + Sync + 'static,
    S: CounterStore + Send + Sync + 'static,
{
    let ledger = DeviceTrustLedger::new(state.repo.clone());

    let user_id = UserId::from_uuid(query.user_id);
    let devices = ledger.list(&user_id).await?;

    Ok(Json(DeviceListResponse {
        devices: devices.into_iter().map(Into::into).collect(),
    }))
}

/// DELETE /api/auth/2fa/devices/{id}
pub async fn revoke_device<R, S>(
    State(state): State<TwoFactorAppState<R, S>>,
    Path(device_id): Path<Uuid>,
    Query(query): Query<DeviceQuery>,
) -> TwoFactorResult<StatusCode>
where
    R: SecondFactorRepository + TrustedDeviceRepository + CredentialStore + Clone + Send + Sync + 'static,
    S: CounterStore + Send + Sync + 'static,
{
    let ledger = DeviceTrustLedger::new(state.repo.clone());

    let user_id = UserId::from_uuid(query.user_id);
    ledger.revoke(&user_id, Some(device_id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Cookie settings for the device-trust cookie
pub fn trust_cookie(config: &TwoFactorConfig) -> CookieConfig {
    CookieConfig {
        name: config.trust_cookie_name.clone(),
        secure: config.cookie_secure,
        http_only: true,
        same_site: config.cookie_same_site,
        path: "/".to_string(),
        max_age_secs: Some(config.trust_ttl_secs()),
    }
}

fn extract_trust_cookie(headers: &HeaderMap, config: &TwoFactorConfig) -> Option<TrustToken> {
    cookie::extract_cookie(headers, &config.trust_cookie_name)
        .and_then(|v| TrustToken::from_cookie(&v))
}
