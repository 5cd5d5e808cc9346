/// Refresh-token record and its lineage bookkeeping.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One persisted refresh credential. The raw secret is never stored; only
/// its salted hash. Successive rotations of a single login share `family_id`
/// and are chained forward through `replaced_by`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub family_id: Uuid,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    /// Set together with `revoked_at` when this record was rotated out;
    /// always points at a record in the same family.
    pub replaced_by: Option<Uuid>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub device_fingerprint: Option<String>,
}

impl RefreshTokenRecord {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Active iff never revoked and not yet expired. Only active records may
    /// be rotated.
    pub fn is_active(&self) -> bool {
        !self.is_revoked() && !self.is_expired()
    }
}

/// Session-binding metadata captured at issuance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionBinding {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub device_fingerprint: Option<String>,
}

/// Insert payload for a refresh-token record.
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub user_id: Uuid,
    pub family_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub binding: SessionBinding,
}
