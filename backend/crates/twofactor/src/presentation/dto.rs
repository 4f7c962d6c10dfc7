//! API DTOs (Data Transfer Objects)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entity::trusted_device::TrustedDevice;

// ============================================================================
// Login
// ============================================================================

/// Throttle pre-check request; email is optional for anonymous pre-checks
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginAttemptRequest {
    #[serde(default)]
    pub email: Option<String>,
}

/// Login request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_id: Uuid,
    /// True when a TOTP code must be submitted to finish the login
    pub second_factor_required: bool,
}

// ============================================================================
// Enrollment
// ============================================================================

/// Enrollment setup request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupRequest {
    pub user_id: Uuid,
    /// Account label shown in the authenticator app, typically the email
    pub account_label: String,
}

/// Enrollment setup response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupResponse {
    /// Secret for manual entry
    pub secret: String,
    /// otpauth:// URI
    pub otpauth_uri: String,
    /// QR code as base64-encoded PNG; absent when rendering failed and
    /// the client should fall back to manual entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_image: Option<String>,
}

/// Enrollment completion request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollVerifyRequest {
    pub user_id: Uuid,
    /// The secret handed out by setup, echoed back by the client
    pub secret: String,
    pub code: String,
}

// ============================================================================
// Challenge / Disable
// ============================================================================

/// Login-time challenge request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyLoginRequest {
    pub user_id: Uuid,
    pub code: String,
}

/// Disable request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisableRequest {
    pub user_id: Uuid,
}

/// Generic success response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

// ============================================================================
// Trusted Devices
// ============================================================================

/// Query selecting the device owner
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceQuery {
    pub user_id: Uuid,
}

/// One trusted device; the token hash never leaves the server
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustedDeviceResponse {
    pub id: Uuid,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl From<TrustedDevice> for TrustedDeviceResponse {
    fn from(device: TrustedDevice) -> Self {
        Self {
            id: device.id,
            user_agent: device.user_agent,
            created_at: device.created_at,
            last_seen: device.last_seen,
        }
    }
}

/// Trusted device list response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceListResponse {
    pub devices: Vec<TrustedDeviceResponse>,
}
