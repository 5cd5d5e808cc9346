//! Role resolution and the authorization gate.

use uuid::Uuid;

use crate::db::RoleStore;
use crate::error::Result;
use crate::models::Role;

/// Resolve a user's effective roles: their valid assignments only
/// (active, and unexpired if an expiry is set).
pub async fn resolve_roles(store: &dyn RoleStore, user_id: Uuid) -> Result<Vec<Role>> {
    let assignments = store.assignments_for(user_id).await?;
    Ok(assignments
        .into_iter()
        .filter(|a| a.is_valid())
        .map(|a| a.role)
        .collect())
}

/// Pure, total access decision over two role sets. The super role allows
/// unconditionally; otherwise at least one required role must be held.
pub fn authorize(held: &[Role], required: &[Role]) -> bool {
    if held.contains(&Role::SuperAdmin) {
        return true;
    }
    required.iter().any(|role| held.contains(role))
}
