/// Postgres-backed refresh-token store.
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::RefreshTokenStore;
use crate::error::{AuthError, Result};
use crate::models::{NewRefreshToken, RefreshTokenRecord};

#[derive(Clone)]
pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn create(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            INSERT INTO refresh_tokens
                (id, user_id, family_id, token_hash, created_at, expires_at,
                 user_agent, ip_address, device_fingerprint)
            VALUES (gen_random_uuid(), $1, $2, $3, CURRENT_TIMESTAMP, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(token.user_id)
        .bind(token.family_id)
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .bind(&token.binding.user_agent)
        .bind(&token.binding.ip_address)
        .bind(&token.binding.device_fingerprint)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<RefreshTokenRecord>> {
        let records = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT * FROM refresh_tokens WHERE user_id = $1 ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn find_by_family(&self, family_id: Uuid) -> Result<Vec<RefreshTokenRecord>> {
        let records = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT * FROM refresh_tokens WHERE family_id = $1 ORDER BY created_at ASC
            "#,
        )
        .bind(family_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn revoke(&self, token_hash: &str) -> Result<bool> {
        let updated = sqlx::query(
            r#"
            UPDATE refresh_tokens SET revoked_at = CURRENT_TIMESTAMP
            WHERE token_hash = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(token_hash)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated > 0 {
            return Ok(true);
        }

        // Already revoked counts as success; only a missing record is false.
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM refresh_tokens WHERE token_hash = $1)
            "#,
        )
        .bind(token_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn revoke_with_replacement(&self, token_hash: &str, new_token_id: Uuid) -> Result<bool> {
        let updated = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = CURRENT_TIMESTAMP, replaced_by = $2
            WHERE token_hash = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(token_hash)
        .bind(new_token_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated > 0 {
            return Ok(true);
        }

        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM refresh_tokens WHERE token_hash = $1)
            "#,
        )
        .bind(token_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn rotate(
        &self,
        old_token_hash: &str,
        replacement: NewRefreshToken,
    ) -> Result<RefreshTokenRecord> {
        let mut tx = self.pool.begin().await?;

        let new_record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            INSERT INTO refresh_tokens
                (id, user_id, family_id, token_hash, created_at, expires_at,
                 user_agent, ip_address, device_fingerprint)
            VALUES (gen_random_uuid(), $1, $2, $3, CURRENT_TIMESTAMP, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(replacement.user_id)
        .bind(replacement.family_id)
        .bind(&replacement.token_hash)
        .bind(replacement.expires_at)
        .bind(&replacement.binding.user_agent)
        .bind(&replacement.binding.ip_address)
        .bind(&replacement.binding.device_fingerprint)
        .fetch_one(&mut *tx)
        .await?;

        // The guard on revoked_at/expires_at serializes concurrent rotations
        // of the same family: the loser updates zero rows and rolls back.
        let updated = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = CURRENT_TIMESTAMP,
                replaced_by = $2,
                last_used_at = CURRENT_TIMESTAMP
            WHERE token_hash = $1 AND revoked_at IS NULL AND expires_at > CURRENT_TIMESTAMP
            "#,
        )
        .bind(old_token_hash)
        .bind(new_record.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(AuthError::Conflict);
        }

        tx.commit().await?;
        Ok(new_record)
    }

    async fn revoke_family(&self, family_id: Uuid) -> Result<u64> {
        let revoked = sqlx::query(
            r#"
            UPDATE refresh_tokens SET revoked_at = CURRENT_TIMESTAMP
            WHERE family_id = $1 AND revoked_at IS NULL AND expires_at > CURRENT_TIMESTAMP
            "#,
        )
        .bind(family_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(revoked)
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64> {
        let revoked = sqlx::query(
            r#"
            UPDATE refresh_tokens SET revoked_at = CURRENT_TIMESTAMP
            WHERE user_id = $1 AND revoked_at IS NULL AND expires_at > CURRENT_TIMESTAMP
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(revoked)
    }

    async fn update_last_used(&self, token_hash: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE refresh_tokens SET last_used_at = CURRENT_TIMESTAMP WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let purged = sqlx::query(
            r#"
            DELETE FROM refresh_tokens WHERE expires_at < CURRENT_TIMESTAMP
            "#,
        )
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(purged)
    }
}
