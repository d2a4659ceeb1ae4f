//! Shared application state and the runtime settings it is built from.

use std::sync::Arc;

use super::{
    credentials::{Credentials, DEFAULT_HASH_WORKERS, HashCost},
    templates::Templates,
};
use crate::store::{SnippetStore, UserStore};

const DEFAULT_SESSION_TTL_SECONDS: i64 = 12 * 60 * 60;
const DEFAULT_STATIC_DIR: &str = "./ui/static";

/// Runtime settings for the web layer.
#[derive(Clone, Debug)]
pub struct AppConfig {
    static_dir: String,
    session_ttl_seconds: i64,
    session_cookie_secure: bool,
    hash_cost: HashCost,
    hash_workers: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            static_dir: DEFAULT_STATIC_DIR.to_string(),
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            session_cookie_secure: false,
            hash_cost: HashCost::default(),
            hash_workers: DEFAULT_HASH_WORKERS,
        }
    }
}

impl AppConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_static_dir(mut self, dir: String) -> Self {
        self.static_dir = dir;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_cookie_secure(mut self, secure: bool) -> Self {
        self.session_cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn with_hash_cost(mut self, cost: HashCost) -> Self {
        self.hash_cost = cost;
        self
    }

    #[must_use]
    pub fn with_hash_workers(mut self, workers: usize) -> Self {
        self.hash_workers = workers;
        self
    }

    #[must_use]
    pub fn static_dir(&self) -> &str {
        &self.static_dir
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.session_cookie_secure
    }

    #[must_use]
    pub fn hash_cost(&self) -> HashCost {
        self.hash_cost
    }

    #[must_use]
    pub fn hash_workers(&self) -> usize {
        self.hash_workers
    }
}

/// Everything a handler needs, cloned cheaply into each request.
#[derive(Clone)]
pub struct AppState {
    pub snippets: Arc<dyn SnippetStore>,
    pub users: Arc<dyn UserStore>,
    pub credentials: Arc<Credentials>,
    pub templates: Arc<Templates>,
}

impl AppState {
    #[must_use]
    pub fn new(
        snippets: Arc<dyn SnippetStore>,
        users: Arc<dyn UserStore>,
        credentials: Credentials,
        templates: Templates,
    ) -> Self {
        Self {
            snippets,
            users,
            credentials: Arc::new(credentials),
            templates: Arc::new(templates),
        }
    }
}
