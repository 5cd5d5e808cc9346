pub mod session;

pub use session::{LogoutScope, SessionService, TokenPair};
