//! Datastore boundary: snippet and user records plus the traits the web layer
//! talks to.
//!
//! Handlers only see [`SnippetStore`] and [`UserStore`]; the Postgres adapter in
//! [`postgres`] is wired in at startup.

pub mod postgres;

#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A user-submitted, time-limited text post.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Snippet {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
}

/// A registered account. The password hash never leaves the store through this type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub active: bool,
    pub created: DateTime<Utc>,
}

/// Lookup result used by authentication: the user id and its stored hash.
#[derive(Clone, Debug)]
pub struct StoredCredentials {
    pub user_id: i64,
    pub hashed_password: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no matching record found")]
    NotFound,
    #[error("email address is already in use")]
    DuplicateEmail,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait SnippetStore: Send + Sync {
    /// Insert a snippet that expires `expires_in_days` from now and return its id.
    async fn insert(
        &self,
        title: &str,
        content: &str,
        expires_in_days: i32,
    ) -> Result<i64, StoreError>;

    /// Fetch a non-expired snippet; expired rows yield [`StoreError::NotFound`].
    async fn get(&self, id: i64) -> Result<Snippet, StoreError>;

    /// Most recently created non-expired snippets, newest first.
    async fn latest(&self, limit: i64) -> Result<Vec<Snippet>, StoreError>;

    /// Check that the datastore is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user with an already-hashed password and return its id.
    ///
    /// A clash on the unique email constraint yields [`StoreError::DuplicateEmail`].
    async fn insert(&self, name: &str, email: &str, hashed_password: &str)
    -> Result<i64, StoreError>;

    /// Credentials of the active user with this email, if any. Emails match
    /// case-insensitively.
    async fn find_active_by_email(
        &self,
        email: &str,
    ) -> Result<Option<StoredCredentials>, StoreError>;

    async fn get(&self, id: i64) -> Result<User, StoreError>;
}
