pub mod refresh_token;
pub mod role;
pub mod user;

pub use refresh_token::{NewRefreshToken, RefreshTokenRecord, SessionBinding};
pub use role::{Role, RoleAssignment};
pub use user::{FederatedProfile, LoginRequest, Principal, RefreshRequest, User};
