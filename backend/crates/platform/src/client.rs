//! Client identification utilities
//!
//! Common functions for identifying clients via HTTP headers. Used for
//! per-origin rate limiting and trusted-device metadata.

use axum::http::{HeaderMap, header};
use std::net::IpAddr;

/// Maximum stored User-Agent length; longer values are truncated
pub const MAX_USER_AGENT_LEN: usize = 256;

/// Extract client IP address from headers
///
/// Checks X-Forwarded-For header first (for reverse proxy setups),
/// then falls back to direct connection IP.
pub fn extract_client_ip(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> Option<IpAddr> {
    // First IP in the X-Forwarded-For list is the originating client
    if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first_ip) = xff.split(',').next() {
            if let Ok(ip) = first_ip.trim().parse::<IpAddr>() {
                return Some(ip);
            }
        }
    }
    direct_ip
}

/// Network-origin key for rate limiting
///
/// Clients behind an unidentifiable origin share a single bucket, which is
/// the fail-safe direction for a throttle.
pub fn origin_key(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> String {
    match extract_client_ip(headers, direct_ip) {
        Some(ip) => ip.to_string(),
        None => "unknown".to_string(),
    }
}

/// Extract the User-Agent header, truncated to [`MAX_USER_AGENT_LEN`]
///
/// Returns an empty string when the header is absent or not valid UTF-8;
/// device metadata is display-only and must never fail a request.
pub fn user_agent(headers: &HeaderMap) -> String {
    let ua = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    truncate_str(ua, MAX_USER_AGENT_LEN).to_string()
}

/// Truncate to at most `max` bytes without splitting a UTF-8 character
pub fn truncate_str(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
