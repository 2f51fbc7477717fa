// src/logging.rs

//! Logging setup for `imgbatch` using `tracing` + `tracing-subscriber`.
//!
//! The chosen level applies to this crate's own events. The HTTP stack
//! (`reqwest`, `hyper`, `h2`, `rustls`) stays at `warn` so request plumbing
//! does not bury queue events at `debug`.
//!
//! Level source, first match wins:
//! 1. `--log-level` CLI flag
//! 2. `IMGBATCH_LOG`, either a bare level ("debug") or a full filter
//!    directive ("imgbatch=trace,hyper=debug") passed through untouched
//! 3. `info`
//!
//! Logs go to STDERR so that stdout carries only the run summary.

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

const ENV_VAR: &str = "IMGBATCH_LOG";

const HTTP_TARGETS: [&str; 4] = ["reqwest", "hyper", "h2", "rustls"];

/// Initialise the global logging subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let directives = match cli_level {
        Some(lvl) => crate_directives(level_from_log_level(lvl)),
        None => directives_from_env(std::env::var(ENV_VAR).ok().as_deref()),
    };

    let filter = EnvFilter::try_new(&directives)
        .with_context(|| format!("invalid log filter '{directives}'"))?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn directives_from_env(value: Option<&str>) -> String {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => crate_directives(Level::INFO),
        Some(v) => match parse_level_str(v) {
            Some(level) => crate_directives(level),
            None if v.contains('=') => v.to_string(),
            None => crate_directives(Level::INFO),
        },
    }
}

/// `imgbatch` at `level`, the HTTP stack no chattier than `warn`.
fn crate_directives(level: Level) -> String {
    let http = if level == Level::ERROR { "error" } else { "warn" };
    let mut directives = format!("{}={}", env!("CARGO_CRATE_NAME"), level.as_str().to_lowercase());
    for target in HTTP_TARGETS {
        directives.push_str(&format!(",{target}={http}"));
    }
    directives
}

fn level_from_log_level(lvl: LogLevel) -> Level {
    match lvl {
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_strings_are_lenient() {
        assert_eq!(parse_level_str(" Debug "), Some(Level::DEBUG));
        assert_eq!(parse_level_str("warning"), Some(Level::WARN));
        assert_eq!(parse_level_str("loud"), None);
    }

    #[test]
    fn debug_level_keeps_http_stack_at_warn() {
        let directives = crate_directives(Level::DEBUG);
        assert!(directives.starts_with("imgbatch=debug"));
        for target in HTTP_TARGETS {
            assert!(directives.contains(&format!("{target}=warn")), "{directives}");
        }
        assert!(EnvFilter::try_new(&directives).is_ok());
    }

    #[test]
    fn error_level_quiets_http_stack_too() {
        let directives = crate_directives(Level::ERROR);
        assert!(directives.contains("reqwest=error"));
        assert!(!directives.contains("=warn"));
    }

    #[test]
    fn env_value_is_a_level_or_a_directive() {
        assert_eq!(directives_from_env(None), crate_directives(Level::INFO));
        assert_eq!(directives_from_env(Some("trace")), crate_directives(Level::TRACE));
        assert_eq!(directives_from_env(Some("gibberish")), crate_directives(Level::INFO));
        assert_eq!(
            directives_from_env(Some(" imgbatch=trace,hyper=debug ")),
            "imgbatch=trace,hyper=debug"
        );
    }
}
