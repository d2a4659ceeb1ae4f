//! In-memory datastore used by tests.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Mutex;

use super::{Snippet, SnippetStore, StoreError, StoredCredentials, User, UserStore};

#[derive(Default)]
pub(crate) struct MemoryStore {
    snippets: Mutex<Vec<Snippet>>,
    users: Mutex<Vec<(User, String)>>,
}

impl MemoryStore {
    /// Store a snippet as-is, bypassing expiry computation.
    pub(crate) async fn put_snippet(&self, snippet: Snippet) {
        self.snippets.lock().await.push(snippet);
    }

    pub(crate) async fn user_count(&self) -> usize {
        self.users.lock().await.len()
    }

    pub(crate) async fn snippet_count(&self) -> usize {
        self.snippets.lock().await.len()
    }

    pub(crate) async fn set_active(&self, id: i64, active: bool) {
        let mut users = self.users.lock().await;
        if let Some((user, _)) = users.iter_mut().find(|(user, _)| user.id == id) {
            user.active = active;
        }
    }
}

#[async_trait]
impl SnippetStore for MemoryStore {
    async fn insert(
        &self,
        title: &str,
        content: &str,
        expires_in_days: i32,
    ) -> Result<i64, StoreError> {
        let mut snippets = self.snippets.lock().await;
        let id = snippets.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        let created = Utc::now();
        snippets.push(Snippet {
            id,
            title: title.to_string(),
            content: content.to_string(),
            created,
            expires: created + Duration::days(i64::from(expires_in_days)),
        });
        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<Snippet, StoreError> {
        let now = Utc::now();
        self.snippets
            .lock()
            .await
            .iter()
            .find(|s| s.id == id && s.expires > now)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn latest(&self, limit: i64) -> Result<Vec<Snippet>, StoreError> {
        let now = Utc::now();
        let mut live: Vec<Snippet> = self
            .snippets
            .lock()
            .await
            .iter()
            .filter(|s| s.expires > now)
            .cloned()
            .collect();
        live.sort_by(|a, b| b.created.cmp(&a.created));
        live.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(live)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// Mirrors the `lower(email)` index of the Postgres schema.
fn same_email(stored: &str, candidate: &str) -> bool {
    stored.to_lowercase() == candidate.to_lowercase()
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(
        &self,
        name: &str,
        email: &str,
        hashed_password: &str,
    ) -> Result<i64, StoreError> {
        let mut users = self.users.lock().await;
        if users.iter().any(|(user, _)| same_email(&user.email, email)) {
            return Err(StoreError::DuplicateEmail);
        }
        let id = users.iter().map(|(user, _)| user.id).max().unwrap_or(0) + 1;
        users.push((
            User {
                id,
                name: name.to_string(),
                email: email.to_string(),
                active: true,
                created: Utc::now(),
            },
            hashed_password.to_string(),
        ));
        Ok(id)
    }

    async fn find_active_by_email(
        &self,
        email: &str,
    ) -> Result<Option<StoredCredentials>, StoreError> {
        Ok(self
            .users
            .lock()
            .await
            .iter()
            .find(|(user, _)| same_email(&user.email, email) && user.active)
            .map(|(user, hash)| StoredCredentials {
                user_id: user.id,
                hashed_password: hash.clone(),
            }))
    }

    async fn get(&self, id: i64) -> Result<User, StoreError> {
        self.users
            .lock()
            .await
            .iter()
            .find(|(user, _)| user.id == id)
            .map(|(user, _)| user.clone())
            .ok_or(StoreError::NotFound)
    }
}
