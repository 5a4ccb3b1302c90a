//! Structured logging setup using `tracing-subscriber`.
//!
//! Two variants for the dev-runner:
//! - [`init`]: human-readable output on stderr
//! - [`init_json`]: JSON-formatted output on stderr
//!
//! Both honour `RUST_LOG` (default: `info`). Secrets never reach log
//! statements; error bodies are sanitized before logging.

use tracing_subscriber::EnvFilter;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialise human-readable logging on stderr.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// Initialise JSON logging on stderr, for log-collecting frameworks.
pub fn init_json() {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}
