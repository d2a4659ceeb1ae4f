//! Per-request view data shared by every rendered page.

use anyhow::anyhow;
use axum::{extract::FromRequestParts, http::request::Parts, response::Html};
use chrono::{Datelike, Utc};
use tower_sessions::Session;

use super::{auth::AuthStatus, csrf::CsrfToken, error::AppError, templates::Templates};

pub const FLASH_KEY: &str = "flash";

/// Session, auth status and CSRF token of the current request.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub session: Session,
    pub auth: AuthStatus,
    pub csrf_token: String,
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| anyhow!("session layer is not installed"))?;
        let auth = parts
            .extensions
            .get::<AuthStatus>()
            .copied()
            .unwrap_or(AuthStatus::Anonymous);
        let csrf_token = parts
            .extensions
            .get::<CsrfToken>()
            .map(|token| token.0.clone())
            .ok_or_else(|| anyhow!("CSRF layer is not installed"))?;

        Ok(Self {
            session,
            auth,
            csrf_token,
        })
    }
}

impl RequestContext {
    /// Queue a one-shot message for the next rendered page.
    ///
    /// # Errors
    /// Returns an error if the session store fails.
    pub async fn flash(&self, message: &str) -> Result<(), AppError> {
        self.session.insert(FLASH_KEY, message).await?;
        Ok(())
    }

    /// Render `name` with `data` plus the common page fields.
    ///
    /// The pending flash message is consumed here, so it shows exactly once.
    ///
    /// # Errors
    /// Returns [`AppError::Fault`] if the template is missing or fails to render.
    pub async fn render(
        &self,
        templates: &Templates,
        name: &str,
        mut data: tera::Context,
    ) -> Result<Html<String>, AppError> {
        let flash = self
            .session
            .remove::<String>(FLASH_KEY)
            .await?
            .unwrap_or_default();

        data.insert("current_year", &Utc::now().year());
        data.insert("csrf_token", &self.csrf_token);
        data.insert("flash", &flash);
        data.insert("is_authenticated", &self.auth.is_authenticated());

        let page = templates.render(name, &data)?;
        Ok(Html(page))
    }
}
