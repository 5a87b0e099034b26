//! Salted, cost-tunable secret hashes.
//!
//! Hashes use the bcrypt modular crypt format, `$2b$<cost>$<salt><digest>`,
//! with the salt (22 chars) and digest (31 chars) in bcrypt's base64
//! alphabet. `$2a$`, `$2x$` and `$2y$` hashes produced by other tools are
//! accepted as well.

use base64::{
    alphabet,
    engine::{general_purpose::NO_PAD, GeneralPurpose},
    Engine as _,
};
use rand::RngCore;
use subtle::ConstantTimeEq;

use crate::IdentityError;

/// Length of the random salt, in bytes.
pub const SALT_LEN: usize = 16;

/// Cost used for hashes generated by this crate unless told otherwise.
pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

/// Smallest cost bcrypt accepts.
pub const MIN_COST: u32 = 4;

const MAX_COST: u32 = 31;
const SALT_CHARS: usize = 22;
const DIGEST_CHARS: usize = 31;

const BCRYPT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::BCRYPT,
    NO_PAD.with_decode_allow_trailing_bits(true),
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prefix {
    TwoA,
    TwoB,
    TwoX,
    TwoY,
}

impl Prefix {
    fn version(self) -> bcrypt::Version {
        match self {
            Self::TwoA => bcrypt::Version::TwoA,
            Self::TwoB => bcrypt::Version::TwoB,
            Self::TwoX => bcrypt::Version::TwoX,
            Self::TwoY => bcrypt::Version::TwoY,
        }
    }
}

/// A salted bcrypt hash of a principal's secret.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretHash {
    prefix: Prefix,
    cost: u32,
    salt: [u8; SALT_LEN],
    encoded: String,
}

impl SecretHash {
    /// Hashes `secret` at [`DEFAULT_COST`] under a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Hashing`] if bcrypt rejects the input.
    pub fn generate(secret: &str) -> Result<Self, IdentityError> {
        Self::generate_with_cost(secret, DEFAULT_COST)
    }

    /// Hashes `secret` at `cost` under a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Hashing`] if `cost` is outside 4..=31.
    pub fn generate_with_cost(secret: &str, cost: u32) -> Result<Self, IdentityError> {
        let mut salt = [0u8; SALT_LEN];
        rand::rngs::OsRng.fill_bytes(&mut salt);
        Self::with_salt(salt, secret, cost)
    }

    /// Hashes `secret` at `cost` under the given salt.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Hashing`] if `cost` is outside 4..=31.
    pub fn with_salt(salt: [u8; SALT_LEN], secret: &str, cost: u32) -> Result<Self, IdentityError> {
        let encoded = hash(Prefix::TwoB, cost, salt, secret)?;
        Ok(Self {
            prefix: Prefix::TwoB,
            cost,
            salt,
            encoded,
        })
    }

    /// Work factor of this hash (log2 of the key expansion rounds).
    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Checks `secret` against this hash, comparing digests in constant time.
    pub fn verify(&self, secret: &str) -> bool {
        match hash(self.prefix, self.cost, self.salt, secret) {
            Ok(candidate) => digest_chars(&candidate)
                .ct_eq(digest_chars(&self.encoded))
                .into(),
            Err(err) => {
                tracing::warn!(error = %err, "secret could not be hashed for verification");
                false
            }
        }
    }
}

fn hash(
    prefix: Prefix,
    cost: u32,
    salt: [u8; SALT_LEN],
    secret: &str,
) -> Result<String, IdentityError> {
    bcrypt::hash_with_salt(secret, cost, salt)
        .map(|parts| parts.format_for_version(prefix.version()))
        .map_err(|err| IdentityError::Hashing(err.to_string()))
}

// Encoded hashes are ASCII and end with the digest.
fn digest_chars(encoded: &str) -> &[u8] {
    let bytes = encoded.as_bytes();
    &bytes[bytes.len().saturating_sub(DIGEST_CHARS)..]
}

impl std::fmt::Display for SecretHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encoded)
    }
}

// Never print digests in logs.
impl std::fmt::Debug for SecretHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretHash(cost={}, ..)", self.cost)
    }
}

impl std::str::FromStr for SecretHash {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('$');
        let (Some(""), Some(prefix), Some(cost), Some(body), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(IdentityError::InvalidSecretHash(
                "expected $<version>$<cost>$<salt and digest>",
            ));
        };

        let prefix = match prefix {
            "2a" => Prefix::TwoA,
            "2b" => Prefix::TwoB,
            "2x" => Prefix::TwoX,
            "2y" => Prefix::TwoY,
            _ => return Err(IdentityError::InvalidSecretHash("unsupported bcrypt version")),
        };

        if cost.len() != 2 {
            return Err(IdentityError::InvalidSecretHash("cost must be two digits"));
        }
        let cost: u32 = cost
            .parse()
            .map_err(|_| IdentityError::InvalidSecretHash("cost must be two digits"))?;
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(IdentityError::InvalidSecretHash("cost must be within 4..=31"));
        }

        if body.len() != SALT_CHARS + DIGEST_CHARS || !body.is_ascii() {
            return Err(IdentityError::InvalidSecretHash(
                "salt and digest must be 53 characters",
            ));
        }
        let (salt_chars, digest_chars) = body.split_at(SALT_CHARS);

        let salt: [u8; SALT_LEN] = BCRYPT_BASE64
            .decode(salt_chars)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(IdentityError::InvalidSecretHash("salt is not bcrypt base64"))?;
        if BCRYPT_BASE64.decode(digest_chars).is_err() {
            return Err(IdentityError::InvalidSecretHash("digest is not bcrypt base64"));
        }

        Ok(Self {
            prefix,
            cost,
            salt,
            encoded: s.to_string(),
        })
    }
}
