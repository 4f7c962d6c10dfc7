//! Trust Token Value Object
//!
//! The raw bearer token proving a browser previously completed 2FA.
//! It exists transiently in the issuing response and as a client-held
//! cookie; the server persists only its SHA-256 hash.

use platform::crypto::{random_bytes, sha256, to_base64url};

/// Token entropy in bytes (256 bits)
pub const TRUST_TOKEN_BYTES: usize = 32;

/// Longest cookie value accepted as a candidate token
const MAX_TOKEN_LEN: usize = 128;

/// Raw device-trust bearer token
#[derive(Clone, PartialEq, Eq)]
pub struct TrustToken(String);

impl TrustToken {
    /// Generate a fresh random token
    pub fn generate() -> Self {
        Self(to_base64url(&random_bytes(TRUST_TOKEN_BYTES)))
    }

    /// Accept a presented cookie value as a candidate token.
    ///
    /// Only a length sanity check; an unknown value simply hashes to
    /// nothing in the ledger.
    pub fn from_cookie(value: &str) -> Option<Self> {
        if value.is_empty() || value.len() > MAX_TOKEN_LEN {
            return None;
        }
        Some(Self(value.to_string()))
    }

    /// The value placed in the Set-Cookie header
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// One-way hash persisted by the ledger
    pub fn hash(&self) -> Vec<u8> {
        sha256(self.0.as_bytes()).to_vec()
    }
}

impl std::fmt::Debug for TrustToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TrustToken(<redacted>)")
    }
}
