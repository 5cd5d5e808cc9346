/// Signed identity assertions for the access/refresh token pair.
///
/// Both token kinds are HS256 JWTs, but they are **not interchangeable**:
/// each kind is signed with its own secret and carries its own audience, so
/// an access token presented where a refresh token is expected fails
/// verification structurally (and vice versa), even before any store lookup.
use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which kind of principal the subject is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    Admin,
    Student,
}

/// Claims carried inside every signed token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    pub username: String,
    pub principal: PrincipalKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<Uuid>,
    pub aud: String,
    pub iss: String,
    /// Unique token id, fresh per issued token
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::Invalid)
    }
}

/// The identity a token is minted for.
#[derive(Debug, Clone)]
pub struct TokenIdentity {
    pub user_id: Uuid,
    pub username: String,
    pub principal: PrincipalKind,
    pub admin_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
}

/// Verification failures. `Expired` and `Invalid` are deliberately distinct
/// kinds: callers branch on them to produce the right user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
}

/// Immutable signing configuration, injected at construction.
#[derive(Debug, Clone)]
pub struct SignerConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub issuer: String,
    pub access_audience: String,
    pub refresh_audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct CredentialSigner {
    config: SignerConfig,
}

impl CredentialSigner {
    pub fn new(config: SignerConfig) -> Self {
        Self { config }
    }

    /// Lifetime of an access token, exposed for `expires_in` responses.
    pub fn access_ttl(&self) -> Duration {
        self.config.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.config.refresh_ttl
    }

    /// Issue a short-lived access token.
    pub fn issue_access(&self, identity: &TokenIdentity) -> Result<String> {
        self.issue(
            identity,
            &self.config.access_audience,
            self.config.access_ttl,
            &self.config.access_secret,
        )
    }

    /// Issue a long-lived refresh token.
    pub fn issue_refresh(&self, identity: &TokenIdentity) -> Result<String> {
        self.issue(
            identity,
            &self.config.refresh_audience,
            self.config.refresh_ttl,
            &self.config.refresh_secret,
        )
    }

    /// Verify an access token: signature, issuer, audience, expiry.
    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(token, &self.config.access_audience, &self.config.access_secret)
    }

    /// Verify a refresh token: signature, issuer, audience, expiry.
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(token, &self.config.refresh_audience, &self.config.refresh_secret)
    }

    fn issue(
        &self,
        identity: &TokenIdentity,
        audience: &str,
        ttl: Duration,
        secret: &str,
    ) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: identity.user_id.to_string(),
            username: identity.username.clone(),
            principal: identity.principal,
            admin_id: identity.admin_id,
            student_id: identity.student_id,
            aud: audience.to_string(),
            iss: self.config.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| anyhow!("failed to sign token: {e}"))
    }

    fn verify(&self, token: &str, audience: &str, secret: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_required_spec_claims(&["exp", "aud", "iss"]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        })
    }
}
