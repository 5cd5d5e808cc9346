/// Test fixtures: in-memory store implementations and session harness.
///
/// The in-memory stores honor the same contracts as the Postgres ones
/// (unique token hashes, atomic rotation, idempotent revocation), which is
/// what lets the lifecycle tests run without a database.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use credential_core::{CredentialSigner, SecretHasher, SignerConfig};
use uuid::Uuid;

use crate::db::{RefreshTokenStore, RoleStore, UserDirectory};
use crate::error::{AuthError, Result};
use crate::models::{
    FederatedProfile, NewRefreshToken, Principal, RefreshTokenRecord, RoleAssignment, User,
};
use crate::security::password;
use crate::services::SessionService;

pub const TEST_EMAIL: &str = "test@classloop.dev";
pub const TEST_PASSWORD: &str = "SecurePass123!";

pub fn test_signer_config() -> SignerConfig {
    SignerConfig {
        access_secret: "test-access-secret".to_string(),
        refresh_secret: "test-refresh-secret".to_string(),
        issuer: "classloop-auth".to_string(),
        access_audience: "classloop:access".to_string(),
        refresh_audience: "classloop:refresh".to_string(),
        access_ttl: chrono::Duration::minutes(15),
        refresh_ttl: chrono::Duration::days(30),
    }
}

/// A password-login student account.
pub fn password_user(email: &str) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        username: email.split('@').next().unwrap_or("user").to_string(),
        email: email.to_string(),
        password_hash: Some(password::hash_password(TEST_PASSWORD).unwrap()),
        kind: Principal::Student,
        admin_id: None,
        student_id: Some(Uuid::new_v4()),
        external_id: None,
        disabled_at: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn verified_profile(external_id: &str, email: &str) -> FederatedProfile {
    FederatedProfile {
        external_id: external_id.to_string(),
        email: email.to_string(),
        first_name: "Jane".to_string(),
        last_name: "Doe".to_string(),
        verified_email: true,
    }
}

#[derive(Default)]
pub struct MemoryRefreshTokenStore {
    records: Mutex<Vec<RefreshTokenRecord>>,
    fail_rotations: AtomicUsize,
}

impl MemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` `rotate` calls report a lost race.
    pub fn fail_rotations(&self, n: usize) {
        self.fail_rotations.store(n, Ordering::SeqCst);
    }

    /// Snapshot of every stored record.
    pub fn all(&self) -> Vec<RefreshTokenRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Backdate a record's expiry so it reads as expired.
    pub fn expire(&self, token_id: Uuid) {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.iter_mut().find(|r| r.id == token_id) {
            record.expires_at = Utc::now() - chrono::Duration::seconds(1);
        }
    }

    fn materialize(token: NewRefreshToken) -> RefreshTokenRecord {
        RefreshTokenRecord {
            id: Uuid::new_v4(),
            user_id: token.user_id,
            family_id: token.family_id,
            token_hash: token.token_hash,
            created_at: Utc::now(),
            expires_at: token.expires_at,
            last_used_at: None,
            revoked_at: None,
            replaced_by: None,
            user_agent: token.binding.user_agent,
            ip_address: token.binding.ip_address,
            device_fingerprint: token.binding.device_fingerprint,
        }
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryRefreshTokenStore {
    async fn create(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord> {
        let mut records = self.records.lock().unwrap();
        if records.iter().any(|r| r.token_hash == token.token_hash) {
            return Err(AuthError::Conflict);
        }
        let record = Self::materialize(token);
        records.push(record.clone());
        Ok(record)
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<RefreshTokenRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_by_family(&self, family_id: Uuid) -> Result<Vec<RefreshTokenRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .filter(|r| r.family_id == family_id)
            .cloned()
            .collect())
    }

    async fn revoke(&self, token_hash: &str) -> Result<bool> {
        let mut records = self.records.lock().unwrap();
        match records.iter_mut().find(|r| r.token_hash == token_hash) {
            Some(record) => {
                if record.revoked_at.is_none() {
                    record.revoked_at = Some(Utc::now());
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn revoke_with_replacement(&self, token_hash: &str, new_token_id: Uuid) -> Result<bool> {
        let mut records = self.records.lock().unwrap();
        match records.iter_mut().find(|r| r.token_hash == token_hash) {
            Some(record) => {
                if record.revoked_at.is_none() {
                    record.revoked_at = Some(Utc::now());
                    record.replaced_by = Some(new_token_id);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn rotate(
        &self,
        old_token_hash: &str,
        replacement: NewRefreshToken,
    ) -> Result<RefreshTokenRecord> {
        let mut records = self.records.lock().unwrap();

        if self
            .fail_rotations
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(AuthError::Conflict);
        }
        if records.iter().any(|r| r.token_hash == replacement.token_hash) {
            return Err(AuthError::Conflict);
        }

        let old_index = records
            .iter()
            .position(|r| r.token_hash == old_token_hash && r.is_active())
            .ok_or(AuthError::Conflict)?;

        let new_record = Self::materialize(replacement);
        let now = Utc::now();
        records[old_index].revoked_at = Some(now);
        records[old_index].replaced_by = Some(new_record.id);
        records[old_index].last_used_at = Some(now);
        records.push(new_record.clone());

        Ok(new_record)
    }

    async fn revoke_family(&self, family_id: Uuid) -> Result<u64> {
        let mut records = self.records.lock().unwrap();
        let now = Utc::now();
        let mut revoked = 0;
        for record in records
            .iter_mut()
            .filter(|r| r.family_id == family_id && r.is_active())
        {
            record.revoked_at = Some(now);
            revoked += 1;
        }
        Ok(revoked)
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64> {
        let mut records = self.records.lock().unwrap();
        let now = Utc::now();
        let mut revoked = 0;
        for record in records
            .iter_mut()
            .filter(|r| r.user_id == user_id && r.is_active())
        {
            record.revoked_at = Some(now);
            revoked += 1;
        }
        Ok(revoked)
    }

    async fn update_last_used(&self, token_hash: &str) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.iter_mut().find(|r| r.token_hash == token_hash) {
            record.last_used_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| !r.is_expired());
        Ok((before - records.len()) as u64)
    }
}

#[derive(Default)]
pub struct MemoryUserDirectory {
    users: Mutex<Vec<User>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, user: User) {
        self.users.lock().unwrap().push(user);
    }

    pub fn remove(&self, user_id: Uuid) {
        self.users.lock().unwrap().retain(|u| u.id != user_id);
    }

    pub fn disable(&self, user_id: Uuid) {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.id == user_id) {
            user.disabled_at = Some(Utc::now());
        }
    }

    pub fn all(&self) -> Vec<User> {
        self.users.lock().unwrap().clone()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn resolve_federated(&self, profile: &FederatedProfile) -> Result<User> {
        let mut users = self.users.lock().unwrap();

        if let Some(user) = users
            .iter()
            .find(|u| u.external_id.as_deref() == Some(profile.external_id.as_str()))
        {
            return Ok(user.clone());
        }

        if let Some(user) = users.iter_mut().find(|u| u.email == profile.email) {
            user.external_id = Some(profile.external_id.clone());
            return Ok(user.clone());
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: profile
                .email
                .split('@')
                .next()
                .unwrap_or("user")
                .to_string(),
            email: profile.email.clone(),
            password_hash: None,
            kind: Principal::Student,
            admin_id: None,
            student_id: Some(Uuid::new_v4()),
            external_id: Some(profile.external_id.clone()),
            disabled_at: None,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }
}

#[derive(Default)]
pub struct MemoryRoleStore {
    assignments: Mutex<Vec<RoleAssignment>>,
}

impl MemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, assignment: RoleAssignment) {
        self.assignments.lock().unwrap().push(assignment);
    }
}

#[async_trait]
impl RoleStore for MemoryRoleStore {
    async fn assignments_for(&self, user_id: Uuid) -> Result<Vec<RoleAssignment>> {
        let assignments = self.assignments.lock().unwrap();
        Ok(assignments
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }
}

/// A session service wired to in-memory stores, with handles kept open for
/// inspection.
pub struct Harness {
    pub service: SessionService,
    pub tokens: Arc<MemoryRefreshTokenStore>,
    pub users: Arc<MemoryUserDirectory>,
    pub signer: CredentialSigner,
}

pub fn harness() -> Harness {
    harness_with_config(test_signer_config())
}

pub fn harness_with_config(config: SignerConfig) -> Harness {
    let tokens = Arc::new(MemoryRefreshTokenStore::new());
    let users = Arc::new(MemoryUserDirectory::new());
    let signer = CredentialSigner::new(config);

    // bcrypt at its cheapest cost keeps the lifecycle tests fast.
    let service = SessionService::new(
        tokens.clone(),
        users.clone(),
        signer.clone(),
        SecretHasher::new(4),
    );

    Harness {
        service,
        tokens,
        users,
        signer,
    }
}

/// Seed a password user and return it.
pub fn seed_user(harness: &Harness) -> User {
    let user = password_user(TEST_EMAIL);
    harness.users.add(user.clone());
    user
}
