/// User model
use chrono::{DateTime, Utc};
use credential_core::{PrincipalKind, TokenIdentity};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Database-side principal kind, mirrored into token claims as
/// [`PrincipalKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "principal_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Principal {
    Admin,
    Student,
}

impl From<Principal> for PrincipalKind {
    fn from(kind: Principal) -> Self {
        match kind {
            Principal::Admin => PrincipalKind::Admin,
            Principal::Student => PrincipalKind::Student,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// Absent for accounts provisioned through a federated provider only.
    pub password_hash: Option<String>,
    pub kind: Principal,
    pub admin_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    /// Identifier at the federated provider, when linked.
    pub external_id: Option<String>,
    pub disabled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_disabled(&self) -> bool {
        self.disabled_at.is_some()
    }

    /// The identity minted into this user's tokens.
    pub fn token_identity(&self) -> TokenIdentity {
        TokenIdentity {
            user_id: self.id,
            username: self.username.clone(),
            principal: self.kind.into(),
            admin_id: self.admin_id,
            student_id: self.student_id,
        }
    }
}

/// Verified profile handed over by the federated-login collaborator after its
/// own protocol exchange. Nothing here is re-verified.
#[derive(Debug, Clone, Deserialize)]
pub struct FederatedProfile {
    pub external_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub verified_email: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
    pub device_fingerprint: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
    pub device_fingerprint: Option<String>,
}
