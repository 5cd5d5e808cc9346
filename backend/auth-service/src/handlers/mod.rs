pub mod auth;

pub use auth::{
    federated_login, list_user_sessions, login, logout, logout_all_devices, my_roles, my_sessions,
    refresh_token,
};
