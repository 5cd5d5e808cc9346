// Auth Service Library

pub mod authz;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod security;
pub mod services;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use credential_core::{CredentialSigner, SecretHasher};

use crate::config::Config;
use crate::db::{PgRefreshTokenStore, PgRoleStore, PgUserDirectory, RoleStore};
use crate::services::SessionService;

pub use error::{AuthError, Result};

// Re-export commonly used types
pub use models::{RefreshTokenRecord, Role, RoleAssignment, SessionBinding, User};

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub sessions: SessionService,
    pub roles: Arc<dyn RoleStore>,
    pub signer: CredentialSigner,
}

impl AppState {
    pub fn new(db: sqlx::PgPool, config: &Config) -> Self {
        let signer = CredentialSigner::new(config.signer_config());
        let sessions = SessionService::new(
            Arc::new(PgRefreshTokenStore::new(db.clone())),
            Arc::new(PgUserDirectory::new(db.clone())),
            signer.clone(),
            SecretHasher::default(),
        );

        Self {
            db: db.clone(),
            sessions,
            roles: Arc::new(PgRoleStore::new(db)),
            signer,
        }
    }
}
