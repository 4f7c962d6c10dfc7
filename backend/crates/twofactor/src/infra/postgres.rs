//! PostgreSQL Repository Implementations

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{second_factor::SecondFactorConfig, trusted_device::TrustedDevice};
use crate::domain::repository::{
    CredentialStore, SecondFactorRepository, TrustedDeviceRepository,
};
use crate::domain::value_object::{totp_secret::TotpSecret, user_id::UserId};
use crate::error::{TwoFactorError, TwoFactorResult};
use kernel::error::conversions::is_schema_missing;

/// PostgreSQL-backed two-factor repository
#[derive(Clone)]
pub struct PgTwoFactorRepository {
    pool: PgPool,
}

impl PgTwoFactorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Prune trusted devices unseen for longer than the trust lifetime.
    ///
    /// The cookie expires client-side after the same interval; this keeps
    /// the ledger from accumulating dead records.
    pub async fn cleanup_stale(&self, trust_ttl: std::time::Duration) -> TwoFactorResult<u64> {
        let cutoff = Utc::now()
            - Duration::from_std(trust_ttl)
                .map_err(|e| TwoFactorError::Internal(format!("Invalid trust TTL: {e}")))?;

        let deleted = sqlx::query("DELETE FROM trusted_devices WHERE last_seen < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::info!(devices_deleted = deleted, "Pruned stale trusted devices");

        Ok(deleted)
    }
}

/// Classify ledger storage errors.
///
/// Missing table/column (typed Postgres error codes, not message text)
/// becomes `LedgerUnavailable` so callers can enter degraded trust mode.
fn classify_ledger_error(err: sqlx::Error) -> TwoFactorError {
    if is_schema_missing(&err) {
        tracing::error!(error = %err, "Trusted device schema not provisioned");
        TwoFactorError::LedgerUnavailable
    } else {
        TwoFactorError::Database(err)
    }
}

// ============================================================================
// Second-Factor Configuration Repository Implementation
// ============================================================================

impl SecondFactorRepository for PgTwoFactorRepository {
    async fn find_config(&self, user_id: &UserId) -> TwoFactorResult<Option<SecondFactorConfig>> {
        let row = sqlx::query_as::<_, SecondFactorRow>(
            r#"
            SELECT user_id, secret, enabled, created_at
            FROM second_factor_configs
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_config()).transpose()
    }

    async fn save_config(&self, config: &SecondFactorConfig) -> TwoFactorResult<()> {
        sqlx::query(
            r#"
            INSERT INTO second_factor_configs (user_id, secret, enabled, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                secret = EXCLUDED.secret,
                enabled = EXCLUDED.enabled,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(config.user_id.as_uuid())
        .bind(config.secret.as_base32())
        .bind(config.enabled)
        .bind(config.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn clear_config(&self, user_id: &UserId) -> TwoFactorResult<()> {
        sqlx::query("DELETE FROM second_factor_configs WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

// ============================================================================
// Trusted Device Repository Implementation
// ============================================================================

impl TrustedDeviceRepository for PgTwoFactorRepository {
    async fn insert_device(&self, device: &TrustedDevice) -> TwoFactorResult<()> {
        sqlx::query(
            r#"
            INSERT INTO trusted_devices (
                id, user_id, token_hash, user_agent, created_at, last_seen
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(device.id)
        .bind(device.user_id.as_uuid())
        .bind(&device.token_hash)
        .bind(&device.user_agent)
        .bind(device.created_at)
        .bind(device.last_seen)
        .execute(&self.pool)
        .await
        .map_err(classify_ledger_error)?;

        Ok(())
    }

    async fn find_device(
        &self,
        user_id: &UserId,
        token_hash: &[u8],
    ) -> TwoFactorResult<Option<TrustedDevice>> {
        let row = sqlx::query_as::<_, TrustedDeviceRow>(
            r#"
            SELECT id, user_id, token_hash, user_agent, created_at, last_seen
            FROM trusted_devices
            WHERE user_id = $1 AND token_hash = $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify_ledger_error)?;

        Ok(row.map(|r| r.into_device()))
    }

    async fn touch_device(&self, token_hash: &[u8]) -> TwoFactorResult<Option<UserId>> {
        let owner = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE trusted_devices
            SET last_seen = $2
            WHERE token_hash = $1
            RETURNING user_id
            "#,
        )
        .bind(token_hash)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(classify_ledger_error)?;

        Ok(owner.map(UserId::from_uuid))
    }

    async fn list_devices(&self, user_id: &UserId) -> TwoFactorResult<Vec<TrustedDevice>> {
        let rows = sqlx::query_as::<_, TrustedDeviceRow>(
            r#"
            SELECT id, user_id, token_hash, user_agent, created_at, last_seen
            FROM trusted_devices
            WHERE user_id = $1
            ORDER BY last_seen DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(classify_ledger_error)?;

        Ok(rows.into_iter().map(|r| r.into_device()).collect())
    }

    async fn delete_device(&self, user_id: &UserId, device_id: Uuid) -> TwoFactorResult<bool> {
        let deleted = sqlx::query("DELETE FROM trusted_devices WHERE user_id = $1 AND id = $2")
            .bind(user_id.as_uuid())
            .bind(device_id)
            .execute(&self.pool)
            .await
            .map_err(classify_ledger_error)?
            .rows_affected();

        Ok(deleted > 0)
    }

    async fn delete_all_devices(&self, user_id: &UserId) -> TwoFactorResult<u64> {
        let deleted = sqlx::query("DELETE FROM trusted_devices WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(classify_ledger_error)?
            .rows_affected();

        Ok(deleted)
    }
}

// ============================================================================
// Credential Store Implementation
// ============================================================================

impl CredentialStore for PgTwoFactorRepository {
    async fn authenticate(&self, email: &str, password: &str) -> TwoFactorResult<Option<UserId>> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT user_id, password_hash
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        match platform::password::verify_password(password, &row.password_hash) {
            Ok(true) => Ok(Some(UserId::from_uuid(row.user_id))),
            Ok(false) => Ok(None),
            Err(e) => {
                // A corrupt stored hash is an operator problem; the caller
                // only ever learns accept/reject
                tracing::error!(error = %e, "Stored password hash unreadable");
                Ok(None)
            }
        }
    }
}

// ============================================================================
// Row Types for sqlx mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct SecondFactorRow {
    user_id: Uuid,
    secret: String,
    enabled: bool,
    created_at: DateTime<Utc>,
}

impl SecondFactorRow {
    fn into_config(self) -> TwoFactorResult<SecondFactorConfig> {
        let secret = TotpSecret::from_base32(self.secret)
            .map_err(|e| TwoFactorError::Internal(format!("Invalid stored TOTP secret: {}", e)))?;

        Ok(SecondFactorConfig {
            user_id: UserId::from_uuid(self.user_id),
            secret,
            enabled: self.enabled,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TrustedDeviceRow {
    id: Uuid,
    user_id: Uuid,
    token_hash: Vec<u8>,
    user_agent: String,
    created_at: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

impl TrustedDeviceRow {
    fn into_device(self) -> TrustedDevice {
        TrustedDevice {
            id: self.id,
            user_id: UserId::from_uuid(self.user_id),
            token_hash: self.token_hash,
            user_agent: self.user_agent,
            created_at: self.created_at,
            last_seen: self.last_seen,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    user_id: Uuid,
    password_hash: String,
}
