/// Postgres-backed user directory.
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::UserDirectory;
use crate::error::Result;
use crate::models::{FederatedProfile, User};

#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users WHERE external_id = $1
            "#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn link_external_id(&self, user_id: Uuid, external_id: &str) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET external_id = $2, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(external_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_federated(&self, profile: &FederatedProfile) -> Result<User> {
        // Federated accounts are provisioned as students; staff accounts are
        // created through the admin side of the platform.
        let username = profile
            .email
            .split('@')
            .next()
            .unwrap_or(&profile.email)
            .to_string();

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users
                (id, username, email, password_hash, kind, external_id, created_at, updated_at)
            VALUES (gen_random_uuid(), $1, $2, NULL, 'student', $3,
                    CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            RETURNING *
            "#,
        )
        .bind(username)
        .bind(&profile.email)
        .bind(&profile.external_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn resolve_federated(&self, profile: &FederatedProfile) -> Result<User> {
        if let Some(user) = self.find_by_external_id(&profile.external_id).await? {
            return Ok(user);
        }

        // Link by email when the account pre-exists, otherwise provision.
        if let Some(user) = self.find_by_email(&profile.email).await? {
            return self.link_external_id(user.id, &profile.external_id).await;
        }

        let user = self.create_federated(profile).await?;
        tracing::info!(user_id = %user.id, "provisioned account from federated profile");
        Ok(user)
    }
}
