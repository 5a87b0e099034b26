//! Credential and role directory for the tank control server.
//!
//! Principals are registered once at startup from configuration and never
//! change afterwards. Secrets are stored only as salted bcrypt hashes and
//! digests are compared in constant time.
//!
//! The directory is an ordinary value: the server builds one
//! [`CredentialDirectory`] during bootstrap and hands it to whatever needs
//! to authenticate callers.

mod directory;
mod secret;

pub use directory::{CredentialDirectory, Principal, PrincipalSpec};
pub use secret::{SecretHash, DEFAULT_COST, MIN_COST, SALT_LEN};

use thiserror::Error;

/// Errors produced while building the credential directory.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// A principal was configured without a username.
    #[error("username cannot be empty")]
    EmptyUsername,
    /// Two principals share a username.
    #[error("duplicate username: {0}")]
    DuplicateUsername(String),
    /// A principal has neither a secret nor a secret hash.
    #[error("principal '{0}' has no secret configured")]
    MissingSecret(String),
    /// A principal has both a plaintext secret and a secret hash.
    #[error("principal '{0}' configures both secret and secret_hash")]
    AmbiguousSecret(String),
    /// A stored secret hash could not be parsed.
    #[error("invalid secret hash: {0}")]
    InvalidSecretHash(&'static str),
    /// bcrypt refused to hash a secret (cost out of range).
    #[error("failed to hash secret: {0}")]
    Hashing(String),
}
