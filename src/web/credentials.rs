//! Password hashing and account credential checks.
//!
//! Hashes are Argon2id PHC strings. Hashing is CPU-bound, so both hashing and
//! verification run on the blocking pool behind a semaphore that caps how many
//! run at once.

use anyhow::{Context, Result, anyhow};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        self, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
    },
};
use rand::rngs::OsRng;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, instrument};

use super::error::AppError;
use crate::store::{StoreError, UserStore};

pub const DEFAULT_HASH_WORKERS: usize = 4;

/// Argon2id cost settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Salted, slow, one-way password hashing.
#[derive(Clone, Debug)]
pub struct PasswordHasher {
    params: Params,
    permits: Arc<Semaphore>,
    decoy_hash: Arc<str>,
}

impl PasswordHasher {
    /// Computes one hash up front at the configured cost.
    ///
    /// # Errors
    /// Returns an error if the cost settings are out of Argon2's accepted range.
    pub fn new(cost: HashCost, workers: usize) -> Result<Self> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|err| anyhow!("invalid argon2 parameters: {err}"))?;
        let decoy_hash = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone())
            .hash_password(
                SaltString::generate(&mut OsRng).as_str().as_bytes(),
                &SaltString::generate(&mut OsRng),
            )
            .map_err(|err| anyhow!("failed to prepare decoy hash: {err}"))?
            .to_string();
        Ok(Self {
            params,
            permits: Arc::new(Semaphore::new(workers.max(1))),
            decoy_hash: decoy_hash.into(),
        })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    // Held by the blocking task until the hash completes.
    async fn permit(&self) -> Result<OwnedSemaphorePermit> {
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .context("password hashing pool closed")
    }

    /// Hash of a random password at the configured cost; unknown emails are
    /// verified against it.
    fn decoy_hash(&self) -> &str {
        &self.decoy_hash
    }

    /// Hash a plaintext password into a PHC string.
    ///
    /// # Errors
    /// Returns an error if hashing fails or the worker pool is gone.
    pub async fn hash(&self, plaintext: &str) -> Result<String> {
        let permit = self.permit().await?;
        let argon2 = self.argon2();
        let plaintext = plaintext.to_owned();
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(plaintext.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|err| anyhow!("failed to hash password: {err}"))
        })
        .await
        .context("password hashing task failed")?
    }

    /// Check a plaintext password against a stored hash.
    ///
    /// A mismatch is `Ok(false)`; a malformed or unreadable hash is an error.
    ///
    /// # Errors
    /// Returns an error if the stored hash cannot be parsed or verification fails
    /// for any reason other than a mismatch.
    pub async fn verify(&self, hash: &str, plaintext: &str) -> Result<bool> {
        let permit = self.permit().await?;
        let argon2 = self.argon2();
        let hash = hash.to_owned();
        let plaintext = plaintext.to_owned();
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let parsed =
                PasswordHash::new(&hash).map_err(|err| anyhow!("invalid password hash: {err}"))?;
            match argon2.verify_password(plaintext.as_bytes(), &parsed) {
                Ok(()) => Ok(true),
                Err(password_hash::Error::Password) => Ok(false),
                Err(err) => Err(anyhow!("failed to verify password: {err}")),
            }
        })
        .await
        .context("password verification task failed")?
    }
}

/// Account creation and login checks on top of a [`UserStore`].
pub struct Credentials {
    users: Arc<dyn UserStore>,
    hasher: PasswordHasher,
}

impl Credentials {
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>, hasher: PasswordHasher) -> Self {
        Self { users, hasher }
    }

    /// Create an account and return its id.
    ///
    /// # Errors
    /// [`AppError::DuplicateEmail`] when the email is taken; [`AppError::Fault`]
    /// for hashing or datastore failures.
    #[instrument(skip(self, plaintext))]
    pub async fn insert(&self, name: &str, email: &str, plaintext: &str) -> Result<i64, AppError> {
        let hash = self.hasher.hash(plaintext).await?;
        match self.users.insert(name, email, &hash).await {
            Ok(id) => Ok(id),
            Err(StoreError::DuplicateEmail) => Err(AppError::DuplicateEmail),
            Err(err) => Err(err.into()),
        }
    }

    /// Resolve an email and password to the id of an active user.
    ///
    /// Unknown emails and wrong passwords both yield
    /// [`AppError::InvalidCredentials`].
    ///
    /// # Errors
    /// [`AppError::InvalidCredentials`] on any credential mismatch;
    /// [`AppError::Fault`] for a corrupt stored hash or datastore failure.
    #[instrument(skip(self, plaintext))]
    pub async fn authenticate(&self, email: &str, plaintext: &str) -> Result<i64, AppError> {
        let Some(stored) = self.users.find_active_by_email(email).await? else {
            debug!("no active user for email");
            self.hasher
                .verify(self.hasher.decoy_hash(), plaintext)
                .await?;
            return Err(AppError::InvalidCredentials);
        };
        if self.hasher.verify(&stored.hashed_password, plaintext).await? {
            Ok(stored.user_id)
        } else {
            debug!(user_id = stored.user_id, "password mismatch");
            Err(AppError::InvalidCredentials)
        }
    }
}

#[cfg(test)]
pub(crate) fn test_hasher() -> PasswordHasher {
    let cost = HashCost {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    };
    match PasswordHasher::new(cost, 2) {
        Ok(hasher) => hasher,
        Err(err) => panic!("test hasher: {err}"),
    }
}
