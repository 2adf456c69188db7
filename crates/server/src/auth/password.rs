//! Salted Argon2id password hashing.
//!
//! Stored hashes are PHC strings (`$argon2id$v=19$m=...`) so the salt and
//! cost parameters travel with the hash and verification never depends on
//! the parameters currently configured.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use thiserror::Error;

/// Memory cost in KiB (64 MiB). Defaults follow the RFC 9106 second
/// recommended Argon2id profile with four lanes.
pub const DEFAULT_M_COST: u32 = 65_536;
pub const DEFAULT_T_COST: u32 = 3;
pub const DEFAULT_P_COST: u32 = 4;

const DECOY_PASSWORD: &str = "chirpy-decoy-password";

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("invalid password hashing parameters: {0}")]
    Params(String),

    #[error("failed to hash password: {0}")]
    Hash(String),
}

/// Hashes and verifies account passwords.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    decoy_hash: String,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher").finish_non_exhaustive()
    }
}

impl PasswordHasher {
    pub fn new() -> Result<Self, PasswordError> {
        Self::with_params(DEFAULT_M_COST, DEFAULT_T_COST, DEFAULT_P_COST)
    }

    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, PasswordError> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|error| PasswordError::Params(error.to_string()))?;
        let mut hasher = Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            decoy_hash: String::new(),
        };
        hasher.decoy_hash = hasher.hash(DECOY_PASSWORD)?;
        Ok(hasher)
    }

    /// Hashes `plaintext` with a fresh random salt. Two calls with the same
    /// input never return the same string.
    pub fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|error| PasswordError::Hash(error.to_string()))
    }

    /// Returns true only when `plaintext` matches `stored_hash`. A stored
    /// hash that fails to parse is reported as a mismatch.
    pub fn verify(&self, stored_hash: &str, plaintext: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            tracing::warn!("stored password hash is not a valid PHC string");
            return false;
        };
        self.argon2.verify_password(plaintext.as_bytes(), &parsed).is_ok()
    }

    /// Runs a full verification against a throwaway hash so that lookups for
    /// unknown accounts cost the same as a real password check.
    pub fn verify_decoy(&self, plaintext: &str) {
        let _ = self.verify(&self.decoy_hash, plaintext);
    }
}
