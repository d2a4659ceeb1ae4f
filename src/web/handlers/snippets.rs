//! Snippet pages: listing, display and creation.

use axum::{
    body::Bytes,
    extract::{Extension, Path},
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::{debug, info, instrument};

use crate::web::{
    context::RequestContext,
    error::AppError,
    forms::Form,
    state::AppState,
};

/// Number of snippets listed on the home page.
pub const LATEST_LIMIT: i64 = 10;
pub const TITLE_MAX_CHARS: usize = 100;
pub const EXPIRY_DAYS: [&str; 3] = ["1", "7", "365"];
const DEFAULT_EXPIRY_DAYS: &str = "365";
const CREATED_FLASH: &str = "Snippet successfully created!";

pub async fn home(
    ctx: RequestContext,
    Extension(state): Extension<AppState>,
) -> Result<Html<String>, AppError> {
    let snippets = state.snippets.latest(LATEST_LIMIT).await?;
    let mut data = tera::Context::new();
    data.insert("snippets", &snippets);
    ctx.render(&state.templates, "home.page.html", data).await
}

/// Only positive integers name a snippet; anything else is treated as absent.
fn parse_id(raw: &str) -> Result<i64, AppError> {
    match raw.parse::<i64>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(AppError::NotFound),
    }
}

pub async fn show(
    ctx: RequestContext,
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    let id = parse_id(&id)?;
    let snippet = state.snippets.get(id).await?;
    let mut data = tera::Context::new();
    data.insert("snippet", &snippet);
    ctx.render(&state.templates, "show.page.html", data).await
}

pub async fn create_form(
    ctx: RequestContext,
    Extension(state): Extension<AppState>,
) -> Result<Html<String>, AppError> {
    let form = Form::with_defaults(&[("expires", DEFAULT_EXPIRY_DAYS)]);
    let mut data = tera::Context::new();
    data.insert("form", &form);
    ctx.render(&state.templates, "create.page.html", data).await
}

fn validate(form: &mut Form) {
    form.required(&["title", "content", "expires"]);
    form.max_length("title", TITLE_MAX_CHARS);
    form.no_nul_bytes(&["title", "content"]);
    form.permitted_values("expires", &EXPIRY_DAYS);
}

#[instrument(skip_all)]
pub async fn create(
    ctx: RequestContext,
    Extension(state): Extension<AppState>,
    body: Bytes,
) -> Result<Response, AppError> {
    let mut form = Form::from_urlencoded(&body);
    validate(&mut form);

    if !form.valid() {
        debug!("snippet form rejected");
        let mut data = tera::Context::new();
        data.insert("form", &form);
        let page = ctx.render(&state.templates, "create.page.html", data).await?;
        return Ok(page.into_response());
    }

    let expires: i32 = form.get("expires").parse().map_err(|_| AppError::BadRequest)?;
    let id = state
        .snippets
        .insert(form.get("title"), form.get("content"), expires)
        .await?;
    info!(snippet_id = id, "snippet created");

    ctx.flash(CREATED_FLASH).await?;
    Ok(Redirect::to(&format!("/snippets/{id}")).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_accepts_positive_integers_only() {
        assert!(matches!(parse_id("1"), Ok(1)));
        assert!(matches!(parse_id("42"), Ok(42)));
        for raw in ["0", "-1", "abc", "1.5", "", "99999999999999999999"] {
            assert!(matches!(parse_id(raw), Err(AppError::NotFound)), "raw {raw:?}");
        }
    }

    #[test]
    fn snippet_rules() {
        let mut form = Form::with_defaults(&[("title", "Hi"), ("content", "x"), ("expires", "7")]);
        validate(&mut form);
        assert!(form.valid());

        let long = "a".repeat(TITLE_MAX_CHARS + 1);
        let mut form = Form::with_defaults(&[
            ("title", long.as_str()),
            ("content", " "),
            ("expires", "30"),
        ]);
        validate(&mut form);
        assert_eq!(
            form.errors().get("title"),
            "This field is too long (maximum is 100 characters)"
        );
        assert_eq!(form.errors().get("content"), "This field cannot be blank.");
        assert_eq!(form.errors().get("expires"), "This field is invalid.");
    }
}
