//! Session lifecycle: login, rotation, logout.
//!
//! One login opens one token *family*. Each refresh rotates the family
//! forward: the presented record is revoked with a pointer to its
//! replacement, inserted in the same atomic store operation, so the family
//! has at most one active record at any point in its history. A replayed
//! secret that matches a rotated-out record terminates the whole family.

use std::sync::Arc;

use chrono::Utc;
use credential_core::{CredentialSigner, SecretHasher};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{RefreshTokenStore, UserDirectory};
use crate::error::{AuthError, Result};
use crate::metrics;
use crate::models::{FederatedProfile, NewRefreshToken, RefreshTokenRecord, SessionBinding, User};
use crate::security::password;

/// Freshly issued credentials for one session.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub user_id: Uuid,
    pub username: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Access-token lifetime in seconds.
    pub expires_in: i64,
}

/// How far a logout reaches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogoutScope {
    /// Revoke only the presented token.
    #[default]
    Token,
    /// Revoke the presented token's whole family.
    Family,
}

#[derive(Clone)]
pub struct SessionService {
    tokens: Arc<dyn RefreshTokenStore>,
    users: Arc<dyn UserDirectory>,
    signer: CredentialSigner,
    hasher: SecretHasher,
}

impl SessionService {
    pub fn new(
        tokens: Arc<dyn RefreshTokenStore>,
        users: Arc<dyn UserDirectory>,
        signer: CredentialSigner,
        hasher: SecretHasher,
    ) -> Self {
        Self {
            tokens,
            users,
            signer,
            hasher,
        }
    }

    /// Authenticate with email and password and open a new session.
    ///
    /// Unknown user, wrong password and disabled account are indistinguishable
    /// to the caller; the logs carry the difference.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        binding: SessionBinding,
    ) -> Result<TokenPair> {
        metrics::inc_login_requests();

        let user = match self.users.find_by_email(email).await? {
            Some(user) => user,
            None => {
                metrics::inc_login_failures();
                tracing::warn!("login rejected: unknown email");
                return Err(AuthError::Unauthorized);
            }
        };

        let stored_hash = user.password_hash.as_deref().ok_or_else(|| {
            metrics::inc_login_failures();
            tracing::warn!(user_id = %user.id, "login rejected: account has no password");
            AuthError::Unauthorized
        })?;

        if password::verify_password(password, stored_hash).is_err() {
            metrics::inc_login_failures();
            tracing::warn!(user_id = %user.id, "login rejected: wrong password");
            return Err(AuthError::Unauthorized);
        }

        self.open_session(&user, binding).await
    }

    /// Open a session for an identity the federated-login collaborator has
    /// already verified. From here on this is exactly a password login.
    pub async fn login_federated(
        &self,
        profile: &FederatedProfile,
        binding: SessionBinding,
    ) -> Result<TokenPair> {
        metrics::inc_login_requests();

        if !profile.verified_email {
            metrics::inc_login_failures();
            tracing::warn!("federated login rejected: unverified email");
            return Err(AuthError::Unauthorized);
        }

        let user = self.users.resolve_federated(profile).await?;
        self.open_session(&user, binding).await
    }

    /// Exchange an active refresh token for a fresh pair, rotating the
    /// family forward.
    pub async fn refresh(&self, presented: &str, binding: SessionBinding) -> Result<TokenPair> {
        let claims = self.signer.verify_refresh(presented)?;
        let user_id = claims.user_id()?;

        let matched = match self.match_presented(user_id, presented).await? {
            Some(record) => record,
            None => {
                tracing::warn!(%user_id, "refresh rejected: no stored record matches");
                return Err(AuthError::Unauthorized);
            }
        };

        if !matched.is_active() {
            // A rotated-out or revoked secret came back. Either a benign
            // client race or a stolen credential; contain both by
            // terminating the family.
            metrics::inc_reuse_detections();
            let revoked = self.tokens.revoke_family(matched.family_id).await?;
            tracing::warn!(
                %user_id,
                family_id = %matched.family_id,
                revoked,
                "inactive refresh token replayed; family revoked"
            );
            return Err(AuthError::Unauthorized);
        }

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        if user.is_disabled() {
            tracing::warn!(%user_id, "refresh rejected: account disabled");
            return Err(AuthError::Unauthorized);
        }

        match self.rotate(&user, &matched, &binding).await {
            Err(AuthError::Conflict) => {
                // A concurrent rotation won the race; one internal retry,
                // then the caller just sees an authentication failure.
                tracing::debug!(%user_id, "rotation lost a race, retrying once");
                match self.rotate(&user, &matched, &binding).await {
                    Err(AuthError::Conflict) => Err(AuthError::Unauthorized),
                    other => other,
                }
            }
            other => other,
        }
    }

    /// Revoke the presented refresh token, or its whole family.
    pub async fn logout(&self, presented: &str, scope: LogoutScope) -> Result<()> {
        let claims = self.signer.verify_refresh(presented)?;
        let user_id = claims.user_id()?;

        let matched = self
            .match_presented(user_id, presented)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        match scope {
            LogoutScope::Token => {
                self.tokens.revoke(&matched.token_hash).await?;
                tracing::info!(%user_id, token_id = %matched.id, "logged out");
            }
            LogoutScope::Family => {
                let revoked = self.tokens.revoke_family(matched.family_id).await?;
                tracing::info!(
                    %user_id,
                    family_id = %matched.family_id,
                    revoked,
                    "logged out token family"
                );
            }
        }

        Ok(())
    }

    /// Revoke every active session of the token's subject. The presented
    /// token must verify, but its own record need not still be active.
    pub async fn logout_all_devices(&self, presented: &str) -> Result<u64> {
        let claims = self.signer.verify_refresh(presented)?;
        let user_id = claims.user_id()?;

        let revoked = self.tokens.revoke_all_for_user(user_id).await?;
        tracing::info!(%user_id, revoked, "logged out all devices");
        Ok(revoked)
    }

    /// The user's currently active sessions.
    pub async fn active_sessions(&self, user_id: Uuid) -> Result<Vec<RefreshTokenRecord>> {
        let records = self.tokens.find_by_user(user_id).await?;
        Ok(records.into_iter().filter(|r| r.is_active()).collect())
    }

    /// Housekeeping passthrough for the background sweeper.
    pub async fn purge_expired(&self) -> Result<u64> {
        self.tokens.purge_expired().await
    }

    /// Single-device policy: a successful login revokes every other active
    /// session before the new family is opened.
    async fn open_session(&self, user: &User, binding: SessionBinding) -> Result<TokenPair> {
        if user.is_disabled() {
            metrics::inc_login_failures();
            tracing::warn!(user_id = %user.id, "login rejected: account disabled");
            return Err(AuthError::Unauthorized);
        }

        let revoked = self.tokens.revoke_all_for_user(user.id).await?;
        if revoked > 0 {
            tracing::info!(user_id = %user.id, revoked, "revoked prior sessions on login");
        }

        let family_id = Uuid::new_v4();
        let (pair, record) = self.mint(user, family_id, &binding)?;
        self.tokens.create(record).await?;

        tracing::info!(user_id = %user.id, %family_id, "session opened");
        Ok(pair)
    }

    async fn rotate(
        &self,
        user: &User,
        old: &RefreshTokenRecord,
        binding: &SessionBinding,
    ) -> Result<TokenPair> {
        let (pair, replacement) = self.mint(user, old.family_id, binding)?;
        let new_record = self.tokens.rotate(&old.token_hash, replacement).await?;

        metrics::inc_token_rotations();
        tracing::info!(
            user_id = %user.id,
            family_id = %old.family_id,
            old_token_id = %old.id,
            new_token_id = %new_record.id,
            "refresh token rotated"
        );
        Ok(pair)
    }

    /// Mint an access/refresh pair into `family_id` and build the hashed
    /// insert payload for the refresh half.
    fn mint(
        &self,
        user: &User,
        family_id: Uuid,
        binding: &SessionBinding,
    ) -> Result<(TokenPair, NewRefreshToken)> {
        let identity = user.token_identity();
        let access_token = self.signer.issue_access(&identity)?;
        let refresh_token = self.signer.issue_refresh(&identity)?;

        let record = NewRefreshToken {
            user_id: user.id,
            family_id,
            token_hash: self.hasher.hash(&refresh_token)?,
            expires_at: Utc::now() + self.signer.refresh_ttl(),
            binding: binding.clone(),
        };

        let pair = TokenPair {
            user_id: user.id,
            username: user.username.clone(),
            access_token,
            refresh_token,
            expires_in: self.signer.access_ttl().num_seconds(),
        };

        Ok((pair, record))
    }

    /// Salted hashes cannot be looked up by secret, so fetch the subject's
    /// candidate records (active *and* revoked) and verify each in turn.
    /// Revoked matches matter: they are the reuse signal.
    async fn match_presented(
        &self,
        user_id: Uuid,
        presented: &str,
    ) -> Result<Option<RefreshTokenRecord>> {
        let candidates = self.tokens.find_by_user(user_id).await?;
        for record in candidates {
            if self.hasher.verify(presented, &record.token_hash) {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }
}
