use crate::web::{self, credentials::HashCost, state::AppConfig};
use anyhow::Result;
use secrecy::{ExposeSecret, SecretString};
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: SecretString,
    pub static_dir: String,
    pub session_ttl_seconds: i64,
    pub session_cookie_secure: bool,
    pub hash_cost: HashCost,
    pub hash_workers: usize,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let config = AppConfig::new()
        .with_static_dir(args.static_dir)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_session_cookie_secure(args.session_cookie_secure)
        .with_hash_cost(args.hash_cost)
        .with_hash_workers(args.hash_workers);

    web::new(args.port, args.dsn, config).await
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("dsn", redact_dsn(args.dsn.expose_secret())),
        ("static_dir", args.static_dir.clone()),
        ("session_ttl_seconds", args.session_ttl_seconds.to_string()),
        (
            "session_cookie_secure",
            args.session_cookie_secure.to_string(),
        ),
        (
            "argon2",
            format!(
                "m={},t={},p={}",
                args.hash_cost.memory_kib, args.hash_cost.iterations, args.hash_cost.parallelism
            ),
        ),
        ("hash_workers", args.hash_workers.to_string()),
    ];
    info!("{}", format_entries("Startup configuration", &entries));
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn format_entries(title: &str, entries: &[(&str, String)]) -> String {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\n{title}:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    message
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() > 7 {
        trimmed[..7].to_string()
    } else {
        trimmed.to_string()
    }
}
