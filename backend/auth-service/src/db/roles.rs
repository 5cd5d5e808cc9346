/// Postgres-backed role-assignment reader.
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::RoleStore;
use crate::error::Result;
use crate::models::RoleAssignment;

#[derive(Clone)]
pub struct PgRoleStore {
    pool: PgPool,
}

impl PgRoleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleStore for PgRoleStore {
    async fn assignments_for(&self, user_id: Uuid) -> Result<Vec<RoleAssignment>> {
        let assignments = sqlx::query_as::<_, RoleAssignment>(
            r#"
            SELECT * FROM role_assignments WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(assignments)
    }
}
