//! Postgres implementation of the datastore traits.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Connection, PgPool, Row, postgres::PgRow};
use tracing::{Instrument, info_span};

use super::{Snippet, SnippetStore, StoreError, StoredCredentials, User, UserStore};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

/// Name of the unique index guarding `lower(users.email)`.
const USERS_EMAIL_CONSTRAINT: &str = "users_uc_email";

/// SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Apply the schema; every statement is idempotent.
///
/// # Errors
/// Returns an error if any schema statement fails.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::raw_sql(SCHEMA_SQL)
        .execute(pool)
        .await
        .context("failed to apply database schema")?;
    Ok(())
}

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_span(operation: &'static str, statement: &'static str) -> tracing::Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn snippet_from_row(row: &PgRow) -> Result<Snippet, sqlx::Error> {
    Ok(Snippet {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        created: row.try_get("created")?,
        expires: row.try_get("expires")?,
    })
}

/// True when the error is the unique violation on the email column.
fn is_duplicate_email(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err
                .code()
                .is_some_and(|code| code.as_ref() == UNIQUE_VIOLATION)
                && db_err.constraint() == Some(USERS_EMAIL_CONSTRAINT)
        }
        _ => false,
    }
}

#[async_trait]
impl SnippetStore for PgStore {
    async fn insert(
        &self,
        title: &str,
        content: &str,
        expires_in_days: i32,
    ) -> Result<i64, StoreError> {
        let query = r"
            INSERT INTO snippets (title, content, created, expires)
            VALUES ($1, $2, NOW(), NOW() + make_interval(days => $3))
            RETURNING id
        ";
        let row = sqlx::query(query)
            .bind(title)
            .bind(content)
            .bind(expires_in_days)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", query))
            .await
            .context("failed to insert snippet")?;

        Ok(row.try_get("id").context("failed to read snippet id")?)
    }

    async fn get(&self, id: i64) -> Result<Snippet, StoreError> {
        let query = r"
            SELECT id, title, content, created, expires FROM snippets
            WHERE expires > NOW() AND id = $1
        ";
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to fetch snippet")?
            .ok_or(StoreError::NotFound)?;

        Ok(snippet_from_row(&row).context("failed to decode snippet")?)
    }

    async fn latest(&self, limit: i64) -> Result<Vec<Snippet>, StoreError> {
        let query = r"
            SELECT id, title, content, created, expires FROM snippets
            WHERE expires > NOW() ORDER BY created DESC LIMIT $1
        ";
        let rows = sqlx::query(query)
            .bind(limit)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to fetch latest snippets")?;

        let snippets = rows
            .iter()
            .map(snippet_from_row)
            .collect::<Result<Vec<_>, _>>()
            .context("failed to decode snippets")?;
        Ok(snippets)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span)
            .await
            .context("failed to acquire database connection")?;
        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping()
            .instrument(ping_span)
            .await
            .context("failed to ping database")?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert(
        &self,
        name: &str,
        email: &str,
        hashed_password: &str,
    ) -> Result<i64, StoreError> {
        let query = r"
            INSERT INTO users (name, email, hashed_password, created)
            VALUES ($1, $2, $3, NOW())
            RETURNING id
        ";
        let result = sqlx::query(query)
            .bind(name)
            .bind(email)
            .bind(hashed_password)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", query))
            .await;

        match result {
            Ok(row) => Ok(row.try_get("id").context("failed to read user id")?),
            Err(err) if is_duplicate_email(&err) => Err(StoreError::DuplicateEmail),
            Err(err) => Err(anyhow::Error::new(err)
                .context("failed to insert user")
                .into()),
        }
    }

    async fn find_active_by_email(
        &self,
        email: &str,
    ) -> Result<Option<StoredCredentials>, StoreError> {
        let query = "SELECT id, hashed_password FROM users WHERE lower(email) = lower($1) AND active = TRUE";
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup user by email")?;

        let Some(row) = row else {
            return Ok(None);
        };
        let credentials = StoredCredentials {
            user_id: row.try_get("id").context("failed to read user id")?,
            hashed_password: row
                .try_get("hashed_password")
                .context("failed to read password hash")?,
        };
        Ok(Some(credentials))
    }

    async fn get(&self, id: i64) -> Result<User, StoreError> {
        let query = "SELECT id, name, email, active, created FROM users WHERE id = $1";
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to fetch user")?
            .ok_or(StoreError::NotFound)?;

        let user = User {
            id: row.try_get("id").context("failed to read user id")?,
            name: row.try_get("name").context("failed to read user name")?,
            email: row.try_get("email").context("failed to read user email")?,
            active: row.try_get("active").context("failed to read user status")?,
            created: row.try_get("created").context("failed to read user created")?,
        };
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
        constraint: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn constraint(&self) -> Option<&str> {
            self.constraint
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn duplicate_email_requires_sqlstate_and_constraint() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
            constraint: Some("users_uc_email"),
        }));
        assert!(is_duplicate_email(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
            constraint: Some("users_pkey"),
        }));
        assert!(!is_duplicate_email(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("99999"),
            constraint: Some("users_uc_email"),
        }));
        assert!(!is_duplicate_email(&err));

        assert!(!is_duplicate_email(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn schema_declares_email_constraint() {
        assert!(SCHEMA_SQL.contains(USERS_EMAIL_CONSTRAINT));
        assert!(SCHEMA_SQL.contains("ON users (lower(email))"));
        assert!(SCHEMA_SQL.contains("CREATE TABLE IF NOT EXISTS snippets"));
    }
}
