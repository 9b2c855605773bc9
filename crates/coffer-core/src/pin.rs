//! # PIN Hashing
//!
//! Salted, one-way hashing for lock PINs and login passwords.
//!
//! ```text
//! lock_funds("1234") ──► PinHasher::hash ──► "$argon2id$v=19$m=19456,t=2,p=1$<salt>$<hash>"
//!                                                       │
//! unlock_funds("1234") ──► PinHasher::verify ◄──────────┘ (PHC string stored per lock)
//! ```
//!
//! The PHC string embeds algorithm, parameters and salt, so hashes created
//! under an older policy still verify after the policy changes.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::validation::validate_pin;
use crate::MIN_PIN_LEN;

/// Argon2 cost parameters plus the minimum PIN length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinPolicy {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
    pub min_len: usize,
}

impl Default for PinPolicy {
    fn default() -> Self {
        PinPolicy {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
            min_len: MIN_PIN_LEN,
        }
    }
}

impl PinPolicy {
    /// Minimal cost parameters for fast test runs.
    pub fn for_tests() -> Self {
        PinPolicy {
            memory_kib: Params::MIN_M_COST.max(64),
            iterations: 1,
            parallelism: 1,
            min_len: MIN_PIN_LEN,
        }
    }

    /// Checks that argon2 accepts the cost parameters.
    pub fn validate(&self) -> CoreResult<()> {
        self.params().map(|_| ())
    }

    fn params(&self) -> CoreResult<Params> {
        Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| CoreError::Hashing(e.to_string()))
    }
}

/// Hashes and verifies secrets under a [`PinPolicy`].
#[derive(Debug, Clone)]
pub struct PinHasher {
    policy: PinPolicy,
}

impl Default for PinHasher {
    fn default() -> Self {
        PinHasher::new(PinPolicy::default())
    }
}

impl PinHasher {
    pub fn new(policy: PinPolicy) -> Self {
        PinHasher { policy }
    }

    pub fn policy(&self) -> &PinPolicy {
        &self.policy
    }

    fn argon2(&self) -> CoreResult<Argon2<'static>> {
        let params = self.policy.params()?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Checks the minimum length without hashing.
    pub fn check_strength(&self, pin: &str) -> CoreResult<()> {
        validate_pin(pin, self.policy.min_len)
    }

    /// Hashes a lock PIN after enforcing the minimum length.
    ///
    /// Each call draws a fresh salt, so hashing the same PIN twice yields
    /// different strings.
    pub fn hash(&self, pin: &str) -> CoreResult<String> {
        self.check_strength(pin)?;
        self.hash_secret(pin)
    }

    /// Hashes an arbitrary secret (login passwords) without a length rule.
    pub fn hash_secret(&self, secret: &str) -> CoreResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()?
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| CoreError::Hashing(e.to_string()))?;

        Ok(hash.to_string())
    }

    /// Verifies a secret against a stored PHC string.
    ///
    /// A malformed stored hash verifies as `false`.
    pub fn verify(&self, secret: &str, stored: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored) else {
            return false;
        };

        // Parameters come from the PHC string, not the current policy.
        Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    }
}
