//! Log output for the command-line tool.
//!
//! Environment:
//! - `RUST_LOG`: filter directives, overriding the configured default
//! - `LOG_FORMAT`: `json` or `text` (default `text`)
//! - `LOG_ANSI`: `true`/`false` to force colors on or off
//!
//! Logs go to stderr so transposed sheets on stdout stay clean.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. `default_filter` applies when `RUST_LOG`
/// is unset or invalid. Returns `false` if a subscriber was already set.
pub fn init_logging(default_filter: &str) -> bool {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .and_then(|v| v.parse::<bool>().ok());

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());
    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        let mut layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
        if let Some(ansi) = log_ansi {
            layer = layer.with_ansi(ansi);
        }
        registry.with(layer).try_init()
    };
    result.is_ok()
}
