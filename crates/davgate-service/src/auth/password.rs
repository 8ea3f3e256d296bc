use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use dashmap::DashSet;
use sha2::{Digest, Sha256};

use crate::error::{ServiceError, ServiceResult};

pub const BCRYPT_MARKER: &str = "{bcrypt}";
pub const ARGON2_MARKER: &str = "{argon2}";

/// How a stored secret must be compared against a supplied one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretScheme {
    Plain,
    Bcrypt,
    Argon2,
}

impl SecretScheme {
    /// ## Summary
    /// Splits a stored secret into its scheme and the material after the marker.
    #[must_use]
    pub fn detect(stored: &str) -> (Self, &str) {
        if let Some(hash) = stored.strip_prefix(BCRYPT_MARKER) {
            (Self::Bcrypt, hash)
        } else if let Some(hash) = stored.strip_prefix(ARGON2_MARKER) {
            (Self::Argon2, hash)
        } else {
            (Self::Plain, stored)
        }
    }

    #[must_use]
    pub const fn is_hashed(self) -> bool {
        !matches!(self, Self::Plain)
    }
}

/// ## Summary
/// Hashes a password using Argon2id with a random salt, tagged with `{argon2}`.
///
/// ## Errors
/// Returns an error if password hashing fails.
pub fn hash_password(password: &str) -> ServiceResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ServiceError::InvalidConfiguration(format!("Failed to hash password: {e}")))?;

    Ok(format!("{ARGON2_MARKER}{password_hash}"))
}

/// ## Summary
/// Hashes a password with bcrypt at the given cost, tagged with `{bcrypt}`.
///
/// ## Errors
/// Returns an error if the cost is out of range.
pub fn hash_password_bcrypt(password: &str, cost: u32) -> ServiceResult<String> {
    let hash = bcrypt::hash(password, cost)
        .map_err(|e| ServiceError::InvalidConfiguration(format!("Failed to hash password: {e}")))?;

    Ok(format!("{BCRYPT_MARKER}{hash}"))
}

fn verify_argon2(password: &str, password_hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(password_hash) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::warn!(error = %e, "Stored argon2 hash is malformed");
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

fn verify_bcrypt(password: &str, password_hash: &str) -> bool {
    bcrypt::verify(password, password_hash).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Stored bcrypt hash is malformed");
        false
    })
}

/// Compares supplied secrets against stored ones.
///
/// Successful hashed comparisons are remembered by a digest of the
/// (stored, supplied) pair, so repeated requests with the same credentials skip
/// the expensive hash. The comparison is a pure function of its inputs, so
/// entries never need invalidating.
#[derive(Debug, Default)]
pub struct SecretVerifier {
    verified: DashSet<[u8; 32]>,
}

impl SecretVerifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ## Summary
    /// Returns `true` when `supplied` matches the `stored` secret under its scheme.
    #[must_use]
    pub fn verify(&self, stored: &str, supplied: &str) -> bool {
        let (scheme, material) = SecretScheme::detect(stored);

        if !scheme.is_hashed() {
            return material == supplied;
        }

        let key = pair_digest(stored, supplied);
        if self.verified.contains(&key) {
            tracing::trace!("Verified pair served from cache");
            return true;
        }

        let matched = match scheme {
            SecretScheme::Bcrypt => verify_bcrypt(supplied, material),
            SecretScheme::Argon2 => verify_argon2(supplied, material),
            SecretScheme::Plain => material == supplied,
        };

        if matched {
            self.verified.insert(key);
        }

        matched
    }

    /// Number of remembered (stored, supplied) pairs.
    #[must_use]
    pub fn cached_pairs(&self) -> usize {
        self.verified.len()
    }
}

fn pair_digest(stored: &str, supplied: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update((stored.len() as u64).to_le_bytes());
    hasher.update(stored.as_bytes());
    hasher.update(supplied.as_bytes());
    hasher.finalize().into()
}
