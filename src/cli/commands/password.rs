use anyhow::{Context, Result};
use clap::{Arg, Command};

use crate::web::credentials::HashCost;

pub const ARG_ARGON2_MEMORY_KIB: &str = "argon2-memory-kib";
pub const ARG_ARGON2_ITERATIONS: &str = "argon2-iterations";
pub const ARG_ARGON2_PARALLELISM: &str = "argon2-parallelism";
pub const ARG_HASH_WORKERS: &str = "hash-workers";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ARGON2_MEMORY_KIB)
                .long(ARG_ARGON2_MEMORY_KIB)
                .help("Argon2id memory cost in KiB")
                .env("SNIPPETBOX_ARGON2_MEMORY_KIB")
                .default_value("19456")
                .value_parser(clap::value_parser!(u32).range(8..)),
        )
        .arg(
            Arg::new(ARG_ARGON2_ITERATIONS)
                .long(ARG_ARGON2_ITERATIONS)
                .help("Argon2id iteration count")
                .env("SNIPPETBOX_ARGON2_ITERATIONS")
                .default_value("2")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_ARGON2_PARALLELISM)
                .long(ARG_ARGON2_PARALLELISM)
                .help("Argon2id lanes")
                .env("SNIPPETBOX_ARGON2_PARALLELISM")
                .default_value("1")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_HASH_WORKERS)
                .long(ARG_HASH_WORKERS)
                .help("Maximum concurrent password hash operations")
                .env("SNIPPETBOX_HASH_WORKERS")
                .default_value("4")
                .value_parser(clap::value_parser!(usize)),
        )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub cost: HashCost,
    pub workers: usize,
}

fn required<T: Copy + Send + Sync + 'static>(matches: &clap::ArgMatches, name: &str) -> Result<T> {
    matches
        .get_one::<T>(name)
        .copied()
        .with_context(|| format!("missing required argument: --{name}"))
}

impl Options {
    /// # Errors
    /// Returns an error if a defaulted argument is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        Ok(Self {
            cost: HashCost {
                memory_kib: required(matches, ARG_ARGON2_MEMORY_KIB)?,
                iterations: required(matches, ARG_ARGON2_ITERATIONS)?,
                parallelism: required(matches, ARG_ARGON2_PARALLELISM)?,
            },
            workers: required(matches, ARG_HASH_WORKERS)?,
        })
    }
}
