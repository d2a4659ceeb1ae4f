//! # Snippetbox
//!
//! `snippetbox` is a server-rendered web application for sharing short-lived
//! text snippets. Anyone can browse snippets that have not yet expired; creating
//! one requires an account.
//!
//! ## Request Pipeline
//!
//! Every request flows through the same middleware stack before reaching a
//! handler: panic recovery, request id, logging, security headers, session
//! loading, CSRF verification and authentication resolution. Guarded routes add
//! one more stage that redirects anonymous visitors to the login page.
//!
//! ## Accounts
//!
//! Passwords are hashed with Argon2id. Login failures never reveal whether the
//! email exists: an unknown email and a wrong password produce the same error.
//! A session that points at a deleted or deactivated user is silently demoted
//! to anonymous on the next request.

pub mod cli;
pub mod store;
pub mod web;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
