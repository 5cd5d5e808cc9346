/// Role model
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Platform roles. `SuperAdmin` is the distinguished role that passes every
/// authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "role_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Teacher,
    Student,
}

/// A role granted to a user. Owned by the role-administration side of the
/// platform; this service only reads them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RoleAssignment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
}

impl RoleAssignment {
    /// Valid iff active and either unexpiring or not yet expired.
    pub fn is_valid(&self) -> bool {
        self.active && self.expires_at.map_or(true, |at| at > Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn assignment(active: bool, expires_at: Option<DateTime<Utc>>) -> RoleAssignment {
        RoleAssignment {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            role: Role::Teacher,
            expires_at,
            active,
        }
    }

    #[test]
    fn test_active_without_expiry_is_valid() {
        assert!(assignment(true, None).is_valid());
    }

    #[test]
    fn test_inactive_is_invalid() {
        assert!(!assignment(false, None).is_valid());
    }

    #[test]
    fn test_expired_is_invalid() {
        assert!(!assignment(true, Some(Utc::now() - Duration::hours(1))).is_valid());
    }

    #[test]
    fn test_future_expiry_is_valid() {
        assert!(assignment(true, Some(Utc::now() + Duration::hours(1))).is_valid());
    }
}
