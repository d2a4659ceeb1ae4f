//! Request-level error type and its mapping onto HTTP responses.

use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use tracing::error;

use crate::store::StoreError;

pub const LOGIN_PATH: &str = "/user/login";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,
    #[error("bad request")]
    BadRequest,
    #[error("missing or invalid CSRF token")]
    Csrf,
    #[error("authentication required")]
    Unauthenticated,
    #[error("email address is already in use")]
    DuplicateEmail,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Fault(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound,
            StoreError::DuplicateEmail => Self::DuplicateEmail,
            StoreError::Other(err) => Self::Fault(err),
        }
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Fault(anyhow::Error::new(err).context("session store failure"))
    }
}

impl From<tera::Error> for AppError {
    fn from(err: tera::Error) -> Self {
        Self::Fault(anyhow::Error::new(err).context("template rendering failed"))
    }
}

fn status_page(status: StatusCode) -> Response {
    let text = status.canonical_reason().unwrap_or("Error");
    (status, text.to_string()).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound => status_page(StatusCode::NOT_FOUND),
            Self::BadRequest | Self::Csrf => status_page(StatusCode::BAD_REQUEST),
            Self::Unauthenticated => {
                let mut response = Redirect::to(LOGIN_PATH).into_response();
                response
                    .headers_mut()
                    .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
                response
            }
            Self::DuplicateEmail => status_page(StatusCode::CONFLICT),
            Self::InvalidCredentials => status_page(StatusCode::UNAUTHORIZED),
            Self::Fault(err) => {
                error!("{err:?}");
                status_page(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn fault_hides_details() -> anyhow::Result<()> {
        let response = AppError::Fault(anyhow!("connection refused to 10.0.0.5")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        assert_eq!(&body[..], b"Internal Server Error");
        Ok(())
    }

    #[test]
    fn unauthenticated_redirects_to_login_without_caching() {
        let response = AppError::Unauthenticated.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION),
            Some(&HeaderValue::from_static(LOGIN_PATH))
        );
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL),
            Some(&HeaderValue::from_static("no-store"))
        );
    }

    #[test]
    fn status_codes() {
        let cases = [
            (AppError::NotFound, StatusCode::NOT_FOUND),
            (AppError::BadRequest, StatusCode::BAD_REQUEST),
            (AppError::Csrf, StatusCode::BAD_REQUEST),
            (AppError::DuplicateEmail, StatusCode::CONFLICT),
            (AppError::InvalidCredentials, StatusCode::UNAUTHORIZED),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn store_errors_map_by_kind() {
        assert!(matches!(
            AppError::from(StoreError::NotFound),
            AppError::NotFound
        ));
        assert!(matches!(
            AppError::from(StoreError::DuplicateEmail),
            AppError::DuplicateEmail
        ));
        assert!(matches!(
            AppError::from(StoreError::Other(anyhow!("boom"))),
            AppError::Fault(_)
        ));
    }
}
