//! Per-session CSRF tokens and the middleware that checks them.

use anyhow::{Context, Result, anyhow};
use axum::{
    body::{Body, to_bytes},
    extract::Request,
    http::Method,
    middleware::Next,
    response::Response,
};
use base64::Engine;
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use tower_sessions::Session;
use tracing::debug;

use super::error::AppError;

pub const SESSION_KEY: &str = "csrf_token";
pub const FORM_FIELD: &str = "csrf_token";
pub const HEADER_NAME: &str = "x-csrf-token";

/// Largest request body buffered while looking for the token.
const MAX_FORM_BYTES: usize = 1024 * 1024;

/// The current session's token, made available to handlers for rendering.
#[derive(Clone, Debug)]
pub struct CsrfToken(pub String);

fn generate_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate CSRF token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Equality check whose running time does not depend on where the inputs differ.
fn tokens_match(expected: &str, submitted: &str) -> bool {
    let expected = Sha256::digest(expected.as_bytes());
    let submitted = Sha256::digest(submitted.as_bytes());
    expected
        .iter()
        .zip(submitted.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

fn is_state_changing(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

fn form_token(body: &[u8]) -> Option<String> {
    url::form_urlencoded::parse(body)
        .find(|(key, _)| key == FORM_FIELD)
        .map(|(_, value)| value.into_owned())
}

/// Ensure the session holds a token, then verify it on state-changing requests.
///
/// The body is buffered to read the form field and handed on unchanged.
pub async fn verify(request: Request, next: Next) -> Result<Response, AppError> {
    let session = request
        .extensions()
        .get::<Session>()
        .cloned()
        .ok_or_else(|| anyhow!("session layer is not installed"))?;

    let token = match session.get::<String>(SESSION_KEY).await? {
        Some(token) => token,
        None => {
            let token = generate_token()?;
            session.insert(SESSION_KEY, &token).await?;
            token
        }
    };

    let mut request = if is_state_changing(request.method()) {
        let header_token = request
            .headers()
            .get(HEADER_NAME)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let (parts, body) = request.into_parts();
        let bytes = to_bytes(body, MAX_FORM_BYTES)
            .await
            .map_err(|_| AppError::BadRequest)?;

        let submitted = header_token.or_else(|| form_token(&bytes));
        match submitted {
            Some(submitted) if tokens_match(&token, &submitted) => {}
            _ => {
                debug!(method = %parts.method, path = %parts.uri.path(), "CSRF check failed");
                return Err(AppError::Csrf);
            }
        }
        Request::from_parts(parts, Body::from(bytes))
    } else {
        request
    };

    request.extensions_mut().insert(CsrfToken(token));
    Ok(next.run(request).await)
}
