//! HTTP surface: router, middleware stack and server lifecycle.

pub mod auth;
pub mod context;
pub mod credentials;
pub mod csrf;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod state;
pub mod templates;


use anyhow::{Context, Result};
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use std::{any::Any, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::PropagateRequestIdLayer,
    services::ServeDir,
    set_header::{SetRequestHeaderLayer, SetResponseHeaderLayer},
    trace::TraceLayer,
};
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore, cookie::SameSite};
use tower_sessions_sqlx_store::PostgresStore;
use tracing::{Span, error, info, info_span};
use ulid::Ulid;

use crate::store::postgres::{self, PgStore};
use credentials::{Credentials, PasswordHasher};
use handlers::{health, snippets, users};
use state::{AppConfig, AppState};
use templates::Templates;

pub const SESSION_COOKIE_NAME: &str = "snippetbox_session";

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, dsn: SecretString, config: AppConfig) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn.expose_secret())
        .await
        .context("Failed to connect to database")?;

    postgres::migrate(&pool).await?;

    let session_store = PostgresStore::new(pool.clone());
    session_store
        .migrate()
        .await
        .context("Failed to migrate session store")?;

    let store = Arc::new(PgStore::new(pool));
    let hasher = PasswordHasher::new(config.hash_cost(), config.hash_workers())?;
    let state = AppState::new(
        store.clone(),
        store.clone(),
        Credentials::new(store, hasher),
        Templates::new()?,
    );

    let app = router(state, session_layer(session_store, &config), config.static_dir());

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Cookie-backed sessions that expire after a period of inactivity.
#[must_use]
pub fn session_layer<S: SessionStore>(store: S, config: &AppConfig) -> SessionManagerLayer<S> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_secure(config.session_cookie_secure())
        .with_expiry(Expiry::OnInactivity(time::Duration::seconds(
            config.session_ttl_seconds(),
        )))
}

/// Build the application router with the full middleware stack.
pub fn router<S: SessionStore + Clone>(
    state: AppState,
    sessions: SessionManagerLayer<S>,
    static_dir: &str,
) -> Router {
    let guarded = Router::new()
        .route("/snippets/create", get(snippets::create_form))
        .route("/snippets", post(snippets::create))
        .route("/user/logout", post(users::logout))
        .route_layer(middleware::from_fn(auth::require_authentication));

    // Only pages carry a session; probes and assets never create one.
    let pages = Router::new()
        .route("/", get(snippets::home))
        .route("/snippets/{id}", get(snippets::show))
        .route("/user/signup", get(users::signup_form).post(users::signup))
        .route("/user/login", get(users::login_form).post(users::login))
        .merge(guarded)
        .layer(
            ServiceBuilder::new()
                .layer(sessions)
                .layer(middleware::from_fn(csrf::verify))
                .layer(middleware::from_fn(auth::authenticate)),
        );

    Router::new()
        .route("/health", get(health))
        .nest_service("/static", ServeDir::new(static_dir))
        .merge(pages)
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_XSS_PROTECTION,
                    HeaderValue::from_static("1; mode=block"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("deny"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::REFERRER_POLICY,
                    HeaderValue::from_static("origin-when-cross-origin"),
                ))
                .layer(Extension(state)),
        )
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

// A panicking handler may have left the connection mid-response.
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "unknown panic payload".to_string()
    };
    error!(panic = %detail, "request handler panicked");

    let mut response = (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));
    response
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}
