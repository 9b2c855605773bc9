//! Argon2 work moved onto tokio's blocking thread pool.
//!
//! Hashing is CPU-bound and takes tens of milliseconds under the default
//! policy, so it never runs on an async worker.

use crate::error::{LedgerError, LedgerResult};
use coffer_core::{CoreError, CoreResult, PinHasher};

async fn blocking<T, F>(work: F) -> LedgerResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> CoreResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| CoreError::Hashing(e.to_string()))?
        .map_err(LedgerError::from)
}

/// Hashes a lock PIN, enforcing the policy's minimum length.
pub(crate) async fn hash_pin(hasher: PinHasher, pin: String) -> LedgerResult<String> {
    blocking(move || hasher.hash(&pin)).await
}

/// Hashes a login password.
pub(crate) async fn hash_password(hasher: PinHasher, password: String) -> LedgerResult<String> {
    blocking(move || hasher.hash_secret(&password)).await
}

/// Verifies a PIN or password against its stored PHC string.
pub(crate) async fn verify(hasher: PinHasher, secret: String, stored: String) -> LedgerResult<bool> {
    blocking(move || Ok(hasher.verify(&secret, &stored))).await
}
