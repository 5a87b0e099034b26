//! Registered principals and their roles.

use std::collections::{BTreeSet, HashMap};

use serde::Deserialize;
use tankctl_types::{CallerIdentity, Role};

use crate::secret::{SecretHash, MIN_COST, SALT_LEN};
use crate::IdentityError;

/// A registered identity.
#[derive(Debug, Clone)]
pub struct Principal {
    username: String,
    secret_hash: SecretHash,
    roles: BTreeSet<Role>,
}

impl Principal {
    pub fn new(
        username: impl Into<String>,
        secret_hash: SecretHash,
        roles: impl IntoIterator<Item = Role>,
    ) -> Self {
        Self {
            username: username.into(),
            secret_hash,
            roles: roles.into_iter().collect(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }
}

/// Configuration entry describing one principal.
///
/// Exactly one of `secret_hash` and `secret` must be set. A plaintext
/// `secret` is hashed at load time at [`MIN_COST`] under a random salt; it
/// exists for development setups only.
#[derive(Debug, Clone, Deserialize)]
pub struct PrincipalSpec {
    pub username: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub secret_hash: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
}

impl PrincipalSpec {
    /// Builds the principal, hashing a plaintext secret if one is given.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError`] if the username is empty, the secret is
    /// missing or ambiguous, or the hash cannot be parsed.
    pub fn into_principal(self) -> Result<Principal, IdentityError> {
        if self.username.trim().is_empty() {
            return Err(IdentityError::EmptyUsername);
        }

        let secret_hash = match (self.secret_hash, self.secret) {
            (Some(encoded), None) => encoded.parse()?,
            (None, Some(plain)) => {
                tracing::warn!(
                    user = %self.username,
                    "principal configured with a plaintext secret; use secret_hash outside development"
                );
                SecretHash::generate_with_cost(&plain, MIN_COST)?
            }
            (Some(_), Some(_)) => return Err(IdentityError::AmbiguousSecret(self.username)),
            (None, None) => return Err(IdentityError::MissingSecret(self.username)),
        };

        Ok(Principal::new(self.username, secret_hash, self.roles))
    }
}

/// The set of principals allowed to use the server.
///
/// Built once at startup; lookups never mutate it, so it can be shared
/// behind an `Arc` without locking.
#[derive(Debug)]
pub struct CredentialDirectory {
    principals: HashMap<String, Principal>,
    // Verified against for unknown usernames so that both paths do the same work.
    decoy: SecretHash,
}

impl CredentialDirectory {
    /// Builds a directory from already constructed principals.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::EmptyUsername`] or
    /// [`IdentityError::DuplicateUsername`].
    pub fn new(principals: impl IntoIterator<Item = Principal>) -> Result<Self, IdentityError> {
        let mut map = HashMap::new();
        for principal in principals {
            if principal.username.trim().is_empty() {
                return Err(IdentityError::EmptyUsername);
            }
            if map.contains_key(&principal.username) {
                return Err(IdentityError::DuplicateUsername(principal.username));
            }
            map.insert(principal.username.clone(), principal);
        }

        let decoy_cost = map
            .values()
            .map(|principal| principal.secret_hash.cost())
            .max()
            .unwrap_or(MIN_COST);

        Ok(Self {
            principals: map,
            decoy: SecretHash::with_salt([0u8; SALT_LEN], "", decoy_cost)?,
        })
    }

    /// Builds a directory from configuration entries.
    ///
    /// # Errors
    ///
    /// Returns the first [`IdentityError`] raised by an entry or by
    /// [`CredentialDirectory::new`].
    pub fn from_specs(specs: impl IntoIterator<Item = PrincipalSpec>) -> Result<Self, IdentityError> {
        let principals = specs
            .into_iter()
            .map(PrincipalSpec::into_principal)
            .collect::<Result<Vec<_>, _>>()?;
        let directory = Self::new(principals)?;
        tracing::info!(count = directory.len(), "loaded credential directory");
        Ok(directory)
    }

    /// Returns `true` iff `username` exists and `secret` matches its hash.
    pub fn authenticate(&self, username: &str, secret: &str) -> bool {
        match self.principals.get(username) {
            Some(principal) => principal.secret_hash.verify(secret),
            None => {
                // Same digest work as a real check.
                std::hint::black_box(self.decoy.verify(secret));
                false
            }
        }
    }

    /// Roles assigned to `username`; empty for unknown usernames.
    pub fn roles_of(&self, username: &str) -> BTreeSet<Role> {
        self.principals
            .get(username)
            .map(|principal| principal.roles.clone())
            .unwrap_or_default()
    }

    /// Authenticates and, on success, returns the caller with its roles.
    ///
    /// Every authenticated caller holds [`Role::AuthenticatedUser`] in
    /// addition to its configured roles.
    pub fn resolve_caller(&self, username: &str, secret: &str) -> Option<CallerIdentity> {
        if !self.authenticate(username, secret) {
            tracing::warn!(user = username, "authentication failed");
            return None;
        }
        let mut roles = self.roles_of(username);
        roles.insert(Role::AuthenticatedUser);
        Some(CallerIdentity::authenticated(username, roles))
    }

    pub fn len(&self) -> usize {
        self.principals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }
}
