//! Account pages: signup, login and logout.

use axum::{
    body::Bytes,
    extract::Extension,
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::{debug, info, instrument};

use crate::web::{
    auth::{AuthStatus, USER_ID_KEY},
    context::RequestContext,
    error::{AppError, LOGIN_PATH},
    forms::{EMAIL_RX, Form},
    state::AppState,
};

pub const NAME_MAX_CHARS: usize = 255;
pub const EMAIL_MAX_CHARS: usize = 255;
pub const PASSWORD_MIN_CHARS: usize = 10;

const DUPLICATE_EMAIL_MESSAGE: &str = "Email address is already in use";
const INVALID_CREDENTIALS_MESSAGE: &str = "Email or Password is incorrect";
const SIGNUP_FLASH: &str = "Your signup was successful. Please log in.";
const LOGOUT_FLASH: &str = "You've been logged out successfully!";
const AFTER_LOGIN_PATH: &str = "/snippets/create";

async fn render_form(
    ctx: &RequestContext,
    state: &AppState,
    page: &str,
    form: &Form,
) -> Result<Html<String>, AppError> {
    let mut data = tera::Context::new();
    data.insert("form", form);
    ctx.render(&state.templates, page, data).await
}

pub async fn signup_form(
    ctx: RequestContext,
    Extension(state): Extension<AppState>,
) -> Result<Html<String>, AppError> {
    render_form(&ctx, &state, "signup.page.html", &Form::default()).await
}

fn validate_signup(form: &mut Form) {
    form.required(&["name", "email", "password"]);
    form.max_length("name", NAME_MAX_CHARS);
    form.max_length("email", EMAIL_MAX_CHARS);
    form.no_nul_bytes(&["name", "email"]);
    form.matches_pattern("email", &EMAIL_RX);
    form.min_length("password", PASSWORD_MIN_CHARS);
}

#[instrument(skip_all)]
pub async fn signup(
    ctx: RequestContext,
    Extension(state): Extension<AppState>,
    body: Bytes,
) -> Result<Response, AppError> {
    let mut form = Form::from_urlencoded(&body);
    validate_signup(&mut form);

    if form.valid() {
        match state
            .credentials
            .insert(form.get("name"), form.get("email"), form.get("password"))
            .await
        {
            Ok(id) => {
                info!(user_id = id, "user signed up");
                ctx.flash(SIGNUP_FLASH).await?;
                return Ok(Redirect::to(LOGIN_PATH).into_response());
            }
            Err(AppError::DuplicateEmail) => {
                form.errors_mut().add("email", DUPLICATE_EMAIL_MESSAGE);
            }
            Err(err) => return Err(err),
        }
    }

    debug!("signup form rejected");
    let page = render_form(&ctx, &state, "signup.page.html", &form).await?;
    Ok(page.into_response())
}

pub async fn login_form(
    ctx: RequestContext,
    Extension(state): Extension<AppState>,
) -> Result<Html<String>, AppError> {
    render_form(&ctx, &state, "login.page.html", &Form::default()).await
}

#[instrument(skip_all)]
pub async fn login(
    ctx: RequestContext,
    Extension(state): Extension<AppState>,
    body: Bytes,
) -> Result<Response, AppError> {
    let mut form = Form::from_urlencoded(&body);
    form.required(&["email", "password"]);
    form.no_nul_bytes(&["email"]);

    let outcome = if form.valid() {
        state
            .credentials
            .authenticate(form.get("email"), form.get("password"))
            .await
    } else {
        Err(AppError::InvalidCredentials)
    };

    match outcome {
        Ok(id) => {
            // New session id before elevating privileges.
            ctx.session.cycle_id().await?;
            ctx.session.insert(USER_ID_KEY, id).await?;
            info!(user_id = id, "user logged in");
            Ok(Redirect::to(AFTER_LOGIN_PATH).into_response())
        }
        Err(AppError::InvalidCredentials) => {
            debug!("login rejected");
            // Field errors would hint at which part was wrong.
            let mut form = Form::with_defaults(&[("email", form.get("email"))]);
            form.errors_mut().add("generic", INVALID_CREDENTIALS_MESSAGE);
            let page = render_form(&ctx, &state, "login.page.html", &form).await?;
            Ok(page.into_response())
        }
        Err(err) => Err(err),
    }
}

pub async fn logout(ctx: RequestContext) -> Result<Response, AppError> {
    if let AuthStatus::Authenticated(id) = ctx.auth {
        info!(user_id = id, "user logged out");
    }
    ctx.session.cycle_id().await?;
    ctx.session.remove::<i64>(USER_ID_KEY).await?;
    ctx.flash(LOGOUT_FLASH).await?;
    Ok(Redirect::to("/").into_response())
}
