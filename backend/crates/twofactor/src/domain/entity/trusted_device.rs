//! Trusted Device Entity
//!
//! One record per browser that completed 2FA. Holds only the hash of the
//! bearer token; possession of the hash alone cannot reconstruct trust.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::value_object::user_id::UserId;
use platform::client::{MAX_USER_AGENT_LEN, truncate_str};

/// Trusted device record
#[derive(Debug, Clone)]
pub struct TrustedDevice {
    pub id: Uuid,
    pub user_id: UserId,
    /// SHA-256 of the raw bearer token; the raw token is never stored
    pub token_hash: Vec<u8>,
    /// Free-text client description, bounded length
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl TrustedDevice {
    /// Create a record for a freshly issued trust token
    pub fn new(user_id: UserId, token_hash: Vec<u8>, user_agent: impl Into<String>) -> Self {
        let now = Utc::now();
        let user_agent = user_agent.into();
        let user_agent = truncate_str(&user_agent, MAX_USER_AGENT_LEN).to_string();

        Self {
            id: Uuid::new_v4(),
            user_id,
            token_hash,
            user_agent,
            created_at: now,
            last_seen: now,
        }
    }

    /// Record activity from this device
    pub fn touch(&mut self) {
        self.last_seen = Utc::now();
    }
}
