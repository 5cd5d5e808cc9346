//! Credential primitives shared across Classloop services.
//!
//! Two building blocks live here: [`SecretHasher`], the at-rest hashing
//! scheme for refresh secrets, and [`CredentialSigner`], which issues and
//! verifies the signed access/refresh token pair. Both are pure and take all
//! configuration through their constructors.

pub mod hash;
pub mod jwt;

pub use hash::SecretHasher;
pub use jwt::{Claims, CredentialSigner, PrincipalKind, SignerConfig, TokenError, TokenIdentity};
