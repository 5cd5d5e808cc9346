//! Persistence boundaries.
//!
//! The session engine talks to storage only through these traits; the
//! Postgres implementations live in the submodules, and the unit tests
//! substitute in-memory ones.

pub mod refresh_tokens;
pub mod roles;
pub mod users;

pub use refresh_tokens::PgRefreshTokenStore;
pub use roles::PgRoleStore;
pub use users::PgUserDirectory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    FederatedProfile, NewRefreshToken, RefreshTokenRecord, RoleAssignment, User,
};

/// Persistent record of every issued refresh credential.
///
/// The hash column is salted, so there is deliberately no lookup-by-secret:
/// callers fetch a subject's candidate set and verify each hash themselves.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn create(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord>;

    /// Every record for the user, active and revoked alike.
    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<RefreshTokenRecord>>;

    async fn find_by_family(&self, family_id: Uuid) -> Result<Vec<RefreshTokenRecord>>;

    /// Revoke one record. Revoking an already-revoked record is a no-op
    /// success; `false` only when no such record exists.
    async fn revoke(&self, token_hash: &str) -> Result<bool>;

    /// Like [`revoke`](Self::revoke), also recording which record replaced
    /// the revoked one.
    async fn revoke_with_replacement(&self, token_hash: &str, new_token_id: Uuid) -> Result<bool>;

    /// The rotation step as one atomic unit: insert `replacement`, revoke
    /// the old record with its replacement pointer set, and stamp the old
    /// record's `last_used_at`. Fails with `Conflict` when the old record
    /// was concurrently revoked or the hash uniqueness constraint fires;
    /// a crash can never leave two active records in one family.
    async fn rotate(
        &self,
        old_token_hash: &str,
        replacement: NewRefreshToken,
    ) -> Result<RefreshTokenRecord>;

    /// Revoke every currently-active record in the family. Already-revoked
    /// records keep their original revocation timestamps.
    async fn revoke_family(&self, family_id: Uuid) -> Result<u64>;

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64>;

    /// Best-effort usage tracking; not security relevant.
    async fn update_last_used(&self, token_hash: &str) -> Result<()>;

    /// Remove long-dead records. Only touches records that are already
    /// inactive, so it is safe to run concurrently with everything else.
    async fn purge_expired(&self) -> Result<u64>;
}

/// Read-side view of user accounts. Account CRUD lives elsewhere; the
/// session engine only resolves identities.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Resolve a verified federated profile to a local account, linking or
    /// provisioning one as needed.
    async fn resolve_federated(&self, profile: &FederatedProfile) -> Result<User>;
}

/// Read-side view of role assignments; role CRUD is owned elsewhere.
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn assignments_for(&self, user_id: Uuid) -> Result<Vec<RoleAssignment>>;
}
