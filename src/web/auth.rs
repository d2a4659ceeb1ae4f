//! Session-based authentication: resolving the visitor and guarding routes.

use anyhow::anyhow;
use axum::{
    extract::Request,
    http::{HeaderValue, header},
    middleware::Next,
    response::Response,
};
use tower_sessions::Session;
use tracing::{debug, info};

use super::{error::AppError, state::AppState};
use crate::store::StoreError;

pub const USER_ID_KEY: &str = "authenticated_user_id";

/// Who the current request belongs to, resolved once per request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthStatus {
    Anonymous,
    Authenticated(i64),
}

impl AuthStatus {
    #[must_use]
    pub fn is_authenticated(self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

/// Decide whether a session user id still names a live account.
///
/// A missing or deactivated user demotes the session to anonymous and drops
/// the stale id.
async fn resolve(state: &AppState, session: &Session) -> Result<AuthStatus, AppError> {
    let Some(id) = session.get::<i64>(USER_ID_KEY).await? else {
        return Ok(AuthStatus::Anonymous);
    };

    match state.users.get(id).await {
        Ok(user) if user.active => Ok(AuthStatus::Authenticated(id)),
        Ok(_) | Err(StoreError::NotFound) => {
            info!(user_id = id, "demoting session of missing or inactive user");
            session.remove::<i64>(USER_ID_KEY).await?;
            Ok(AuthStatus::Anonymous)
        }
        Err(err) => Err(err.into()),
    }
}

/// Attach an [`AuthStatus`] to every request.
pub async fn authenticate(mut request: Request, next: Next) -> Result<Response, AppError> {
    let state = request
        .extensions()
        .get::<AppState>()
        .cloned()
        .ok_or_else(|| anyhow!("application state is not installed"))?;
    let session = request
        .extensions()
        .get::<Session>()
        .cloned()
        .ok_or_else(|| anyhow!("session layer is not installed"))?;

    let status = resolve(&state, &session).await?;
    request.extensions_mut().insert(status);
    Ok(next.run(request).await)
}

/// Redirect anonymous visitors to the login page; guarded pages are never cached.
pub async fn require_authentication(request: Request, next: Next) -> Result<Response, AppError> {
    let status = request
        .extensions()
        .get::<AuthStatus>()
        .copied()
        .unwrap_or(AuthStatus::Anonymous);

    if !status.is_authenticated() {
        debug!(path = %request.uri().path(), "anonymous request to guarded route");
        return Err(AppError::Unauthenticated);
    }

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok(response)
}
